use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub scheduler: SchedulerConfig,
    pub trigger: TriggerConfig,
    pub merge: MergeConfig,
    pub prompt: PromptConfig,
}

/// Transcript chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk duration before closing (ms)
    pub target_duration_ms: u64,
    /// Chunk text size cap (characters)
    pub max_chars: usize,
    /// Words copied from a closed chunk's tail into the next chunk
    pub overlap_words: usize,
}

/// Outbound request scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum requests per rolling minute
    pub requests_per_minute: usize,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// Exponential backoff base delay (ms)
    pub base_retry_delay_ms: u64,
    /// Exponential backoff ceiling (ms)
    pub max_retry_delay_ms: u64,
    /// Bounded wait per outbound call (seconds)
    pub request_timeout_secs: u64,
}

/// Automatic generation trigger policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriggerConfig {
    /// Minimum final segments before a cycle triggers
    pub min_segments: usize,
    /// Minimum total words before a cycle triggers
    pub min_words: usize,
    /// Minimum interval between cycles (ms)
    pub interval_ms: u64,
}

/// Caps applied when merging summary fragments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    pub max_key_points: usize,
    pub max_decisions: usize,
    pub max_action_items: usize,
    pub max_quotes: usize,
    pub max_topics: usize,
    /// Word clamp for the narrative content field
    pub max_content_words: usize,
}

/// Prompt composition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PromptConfig {
    /// Optional free-text instructions overriding the default instruction
    /// block. The structured output-format contract is never overridden.
    pub custom_instructions: Option<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_duration_ms: defaults::TARGET_CHUNK_DURATION_MS,
            max_chars: defaults::MAX_CHUNK_CHARS,
            overlap_words: defaults::OVERLAP_WORDS,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: defaults::REQUESTS_PER_MINUTE,
            max_retries: defaults::MAX_RETRIES,
            base_retry_delay_ms: defaults::BASE_RETRY_DELAY_MS,
            max_retry_delay_ms: defaults::MAX_RETRY_DELAY_MS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_segments: defaults::MIN_TRIGGER_SEGMENTS,
            min_words: defaults::MIN_TRIGGER_WORDS,
            interval_ms: defaults::TRIGGER_INTERVAL_MS,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_key_points: defaults::MAX_KEY_POINTS,
            max_decisions: defaults::MAX_DECISIONS,
            max_action_items: defaults::MAX_ACTION_ITEMS,
            max_quotes: defaults::MAX_QUOTES,
            max_topics: defaults::MAX_TOPICS,
            max_content_words: defaults::MAX_CONTENT_WORDS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// A missing file silently yields defaults; invalid TOML is reported to
    /// stderr and defaults are used so a bad config never takes the pipeline
    /// down mid-session.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                let missing = e
                    .downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false);
                if !missing {
                    eprintln!("sumvox: ignoring config at {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SUMVOX_REQUESTS_PER_MINUTE → scheduler.requests_per_minute
    /// - SUMVOX_MAX_RETRIES → scheduler.max_retries
    /// - SUMVOX_CUSTOM_INSTRUCTIONS → prompt.custom_instructions
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(rpm) = std::env::var("SUMVOX_REQUESTS_PER_MINUTE")
            && let Ok(rpm) = rpm.parse::<usize>()
            && rpm > 0
        {
            self.scheduler.requests_per_minute = rpm;
        }

        if let Ok(retries) = std::env::var("SUMVOX_MAX_RETRIES")
            && let Ok(retries) = retries.parse::<u32>()
        {
            self.scheduler.max_retries = retries;
        }

        if let Ok(instructions) = std::env::var("SUMVOX_CUSTOM_INSTRUCTIONS")
            && !instructions.is_empty()
        {
            self.prompt.custom_instructions = Some(instructions);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/sumvox/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sumvox")
            .join("config.toml")
    }

    /// Reject values the pipeline cannot operate with.
    fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.requests_per_minute == 0 {
            anyhow::bail!("scheduler.requests_per_minute must be positive");
        }
        if self.chunking.max_chars == 0 {
            anyhow::bail!("chunking.max_chars must be positive");
        }
        if self.chunking.target_duration_ms == 0 {
            anyhow::bail!("chunking.target_duration_ms must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunking.target_duration_ms, 30_000);
        assert_eq!(config.chunking.max_chars, 8_000);
        assert_eq!(config.chunking.overlap_words, 50);
        assert_eq!(config.scheduler.requests_per_minute, 10);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.base_retry_delay_ms, 1_000);
        assert_eq!(config.scheduler.max_retry_delay_ms, 10_000);
        assert_eq!(config.merge.max_key_points, 10);
        assert_eq!(config.merge.max_quotes, 5);
        assert_eq!(config.merge.max_topics, 8);
        assert!(config.prompt.custom_instructions.is_none());
    }

    #[test]
    fn test_load_partial_toml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[scheduler]\nrequests_per_minute = 2\n\n[trigger]\nmin_segments = 2\nmin_words = 4"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scheduler.requests_per_minute, 2);
        assert_eq!(config.trigger.min_segments, 2);
        assert_eq!(config.trigger.min_words, 4);
        // Untouched sections fall back to defaults
        assert_eq!(config.chunking.max_chars, 8_000);
        assert_eq!(config.scheduler.max_retries, 3);
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not = toml =").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_rejects_zero_rate_limit() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nrequests_per_minute = 0").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/sumvox.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [[[").unwrap();
        let config = Config::load_or_default(file.path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_custom_instructions_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[prompt]\ncustom_instructions = \"Focus on budget discussions\""
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.prompt.custom_instructions.as_deref(),
            Some("Focus on budget discussions")
        );
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        assert!(path.ends_with("sumvox/config.toml"));
    }

    #[test]
    fn test_config_serializes_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[chunking]"));
        assert!(toml_str.contains("[scheduler]"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
