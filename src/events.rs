//! Typed pipeline events.
//!
//! Consumers subscribe with a channel instead of registering callbacks; the
//! orchestrator never blocks on a slow consumer because sends are
//! non-blocking on an unbounded channel and dropped receivers are ignored.

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};

/// Events emitted while the pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A segment was committed to the transcript
    SegmentFinalized { segment_id: u64, word_count: usize },
    /// A generation cycle started
    GenerationStarted { chunk_count: usize },
    /// Best-effort progress for a running cycle
    GenerationProgress { percent: u8, eta_ms: Option<u64> },
    /// A cycle produced a new running summary
    GenerationSucceeded {
        summary_id: u64,
        is_incremental: bool,
        processing_time_ms: u64,
    },
    /// A cycle failed; the previous summary is kept
    GenerationFailed { message: String, permanent: bool },
}

impl PipelineEvent {
    /// Serialize event to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Create a channel pair for pipeline events.
pub fn event_channel() -> (EventSender, Receiver<PipelineEvent>) {
    let (tx, rx) = unbounded();
    (EventSender { tx }, rx)
}

/// Sending half handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PipelineEvent>,
}

impl EventSender {
    /// Emit an event. A disconnected receiver is not an error; the pipeline
    /// keeps running without observers.
    pub fn send(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}
