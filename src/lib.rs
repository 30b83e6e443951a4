//! sumvox - Incremental transcript summarization
//!
//! Turns a live stream of speech-recognition events into a continuously
//! updated structured summary, using a rate-limited external text-generation
//! service.

// Enforce error handling discipline in library code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod chunk;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod generator;
pub mod merge;
pub mod orchestrator;
pub mod parser;
pub mod progress;
pub mod prompt;
pub mod scheduler;
pub mod segment;
pub mod summary;

// Core pipeline types (events in → summaries out)
pub use orchestrator::{CancelToken, SummarizationOrchestrator};
pub use segment::{SegmentStore, TranscriptSegment};
pub use summary::{RunningSummary, SummaryFragment, Topic};

// Generation seam and scheduling
pub use generator::{MockGenerator, TextGenerator};
pub use scheduler::RequestScheduler;

// Events
pub use events::{EventSender, PipelineEvent, event_channel};

// Error handling
pub use error::{Result, SumvoxError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.2.0+abc1234"` when git hash is available, `"0.2.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
