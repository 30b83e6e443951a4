//! Default configuration constants for sumvox.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default target chunk duration in milliseconds.
///
/// A chunk closes once it spans 30 seconds of transcript, keeping each
/// generation request within a predictable context-window slice.
pub const TARGET_CHUNK_DURATION_MS: u64 = 30_000;

/// Default chunk size cap in characters.
///
/// Whichever of duration or size triggers first closes the chunk. ~8000
/// characters keeps prompts comfortably inside typical model context limits.
pub const MAX_CHUNK_CHARS: usize = 8_000;

/// Default number of overlap words carried from one chunk into the next.
///
/// The tail of each closed chunk is prepended to the next one so the model
/// sees continuity across chunk boundaries without re-reading the transcript.
pub const OVERLAP_WORDS: usize = 50;

/// Default requests-per-rolling-minute limit for the generation service.
pub const REQUESTS_PER_MINUTE: usize = 10;

/// Width of the sliding admission window in milliseconds.
pub const ADMISSION_WINDOW_MS: u64 = 60_000;

/// Default maximum retry attempts for a transient generation failure.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff between retries, in milliseconds.
///
/// Attempt `n` waits `min(MAX_RETRY_DELAY_MS, BASE_RETRY_DELAY_MS * 2^n)`.
pub const BASE_RETRY_DELAY_MS: u64 = 1_000;

/// Ceiling for the exponential backoff delay, in milliseconds.
pub const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// Bounded wait for a single outbound generation call, in seconds.
///
/// A call that exceeds this is treated as a transient failure and retried.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Minimum number of final segments before an automatic generation triggers.
pub const MIN_TRIGGER_SEGMENTS: usize = 3;

/// Minimum total word count before an automatic generation triggers.
pub const MIN_TRIGGER_WORDS: usize = 25;

/// Minimum interval between automatic generations, in milliseconds.
pub const TRIGGER_INTERVAL_MS: u64 = 30_000;

/// Word-count clamp for the narrative `content` field of a summary.
///
/// Model responses are asked for 150-200 words; anything longer is truncated
/// with an ellipsis marker so the running summary stays bounded.
pub const MAX_CONTENT_WORDS: usize = 200;

/// Cap on merged key points, bounding growth over long sessions.
pub const MAX_KEY_POINTS: usize = 10;

/// Cap on merged decisions.
pub const MAX_DECISIONS: usize = 10;

/// Cap on merged action items.
pub const MAX_ACTION_ITEMS: usize = 10;

/// Cap on merged quotes.
pub const MAX_QUOTES: usize = 5;

/// Cap on merged topics.
pub const MAX_TOPICS: usize = 8;

/// Maximum number of final segments retained by a SegmentStore.
///
/// Beyond this, the oldest segments already covered by a summary are dropped
/// (oldest first). Un-summarized text is never evicted.
pub const MAX_RETAINED_SEGMENTS: usize = 10_000;
