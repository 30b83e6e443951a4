//! Error types for sumvox.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SumvoxError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Generation service errors
    /// The remote service itself reported a rate limit. The scheduler
    /// self-throttles, so this normally only appears when the quota is shared
    /// with other clients. Retried.
    #[error("Generation service rate limited: {message}")]
    RateLimited { message: String },

    /// Transient network or service hiccup. Retried.
    #[error("Transient generation failure: {message}")]
    TransientNetwork { message: String },

    /// The request itself is malformed or rejected (e.g. bad credentials).
    /// Never retried — surfaced immediately so the host can reconfigure.
    #[error("Invalid generation request: {message}")]
    InvalidRequest { message: String },

    /// The service is temporarily down. Retried.
    #[error("Generation service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// An outbound call exceeded its bounded wait. Treated as transient.
    #[error("Generation request timed out after {seconds}s")]
    RequestTimeout { seconds: u64 },

    /// The scheduler was shut down while requests were still queued.
    #[error("Request scheduler shut down")]
    SchedulerShutDown,

    /// A generation cycle was cancelled cooperatively; its result was
    /// discarded rather than merged.
    #[error("Generation cycle cancelled")]
    Cancelled,

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl SumvoxError {
    /// Whether the retry policy applies to this error.
    ///
    /// `InvalidRequest` fails fast; everything the remote side might recover
    /// from on its own (rate limits, network blips, outages, timeouts) is
    /// retried up to the configured attempt budget.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SumvoxError::RateLimited { .. }
                | SumvoxError::TransientNetwork { .. }
                | SumvoxError::ServiceUnavailable { .. }
                | SumvoxError::RequestTimeout { .. }
        )
    }

    /// Whether the host application should prompt for reconfiguration
    /// instead of silently retrying. Permanent failures are surfaced
    /// distinctly from transient ones.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SumvoxError::InvalidRequest { .. }
                | SumvoxError::ConfigFileNotFound { .. }
                | SumvoxError::ConfigParse { .. }
                | SumvoxError::ConfigInvalidValue { .. }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SumvoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display() {
        let error = SumvoxError::RateLimited {
            message: "429 from upstream".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Generation service rate limited: 429 from upstream"
        );
    }

    #[test]
    fn test_invalid_request_display() {
        let error = SumvoxError::InvalidRequest {
            message: "missing API key".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid generation request: missing API key"
        );
    }

    #[test]
    fn test_timeout_display() {
        let error = SumvoxError::RequestTimeout { seconds: 60 };
        assert_eq!(error.to_string(), "Generation request timed out after 60s");
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            SumvoxError::TransientNetwork {
                message: "reset".into()
            }
            .is_transient()
        );
        assert!(
            SumvoxError::ServiceUnavailable {
                message: "503".into()
            }
            .is_transient()
        );
        assert!(
            SumvoxError::RateLimited {
                message: "429".into()
            }
            .is_transient()
        );
        assert!(SumvoxError::RequestTimeout { seconds: 60 }.is_transient());
        assert!(
            !SumvoxError::InvalidRequest {
                message: "400".into()
            }
            .is_transient()
        );
        assert!(!SumvoxError::Cancelled.is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(
            SumvoxError::InvalidRequest {
                message: "bad credentials".into()
            }
            .is_permanent()
        );
        assert!(
            !SumvoxError::TransientNetwork {
                message: "reset".into()
            }
            .is_permanent()
        );
        assert!(!SumvoxError::Cancelled.is_permanent());
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = SumvoxError::ConfigInvalidValue {
            key: "scheduler.requests_per_minute".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for scheduler.requests_per_minute: must be positive"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SumvoxError>();
        assert_sync::<SumvoxError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
