//! Groups final transcript segments into bounded, overlapping chunks.
//!
//! A chunk closes when its accumulated duration reaches the target or when
//! adding another segment would push its text past the size cap, whichever
//! triggers first. Each chunk after the first is seeded with the last words
//! of its predecessor so the model sees continuity across chunk boundaries;
//! the seed counts toward the size cap since it is part of the chunk text.

use crate::config::ChunkingConfig;
use crate::segment::TranscriptSegment;
use std::sync::Arc;

/// A bounded grouping of final segments prepared for one generation call.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Segments are referenced, not copied, to avoid duplicating large text.
    pub segments: Vec<Arc<TranscriptSegment>>,
    /// Overlap prefix followed by the concatenated segment texts.
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Tail of the previous chunk, already included at the front of `text`.
    pub overlap_prefix: String,
}

impl Chunk {
    /// Duration spanned by this chunk's segments (ms).
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Word count of the chunk text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Accumulates final segments and emits chunks at configured bounds.
pub struct ChunkBuilder {
    config: ChunkingConfig,
    pending: Vec<Arc<TranscriptSegment>>,
    pending_chars: usize,
    /// Seed for the next chunk, taken from the last emitted chunk's tail.
    next_overlap: String,
}

impl ChunkBuilder {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            pending_chars: 0,
            next_overlap: String::new(),
        }
    }

    /// Accumulates a final segment, returning a chunk when one closes.
    ///
    /// The size check runs before the segment is added: a segment that would
    /// push the chunk text (overlap prefix included) past the cap closes the
    /// pending chunk first and starts the next one. A chunk that closes on
    /// the duration target therefore always fits the size cap.
    ///
    /// Edge case: a single segment whose text alone exceeds the size cap is
    /// emitted as its own chunk immediately, so one long utterance can never
    /// stall the pipeline waiting for more input.
    pub fn add_final_segment(&mut self, segment: Arc<TranscriptSegment>) -> Option<Chunk> {
        if self.pending.is_empty() && segment.text.len() > self.config.max_chars {
            self.pending.push(segment);
            return self.close();
        }

        let segment_chars = segment.text.len() + 1;
        if !self.pending.is_empty()
            && self.overlap_chars() + self.pending_chars + segment_chars > self.config.max_chars
        {
            let chunk = self.close();
            self.pending_chars = segment_chars;
            self.pending.push(segment);
            return chunk;
        }

        self.pending_chars += segment_chars;
        self.pending.push(segment);

        if self.accumulated_duration_ms() >= self.config.target_duration_ms {
            return self.close();
        }
        None
    }

    /// Force-closes the current partial chunk. Used at end-of-session and
    /// when a generation cycle wants everything accumulated so far.
    pub fn flush(&mut self) -> Option<Chunk> {
        if self.pending.is_empty() {
            return None;
        }
        self.close()
    }

    /// Clears accumulated state, including the overlap seed.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.pending_chars = 0;
        self.next_overlap.clear();
    }

    /// Duration spanned by the pending segments (ms).
    pub fn accumulated_duration_ms(&self) -> u64 {
        match (self.pending.first(), self.pending.last()) {
            (Some(first), Some(last)) => last.end_ms().saturating_sub(first.timestamp_ms),
            _ => 0,
        }
    }

    /// Number of pending segments not yet emitted.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Characters the overlap seed will contribute to the next chunk's text,
    /// including its joining space.
    fn overlap_chars(&self) -> usize {
        if self.next_overlap.is_empty() {
            0
        } else {
            self.next_overlap.len() + 1
        }
    }

    fn close(&mut self) -> Option<Chunk> {
        let segments = std::mem::take(&mut self.pending);
        self.pending_chars = 0;
        let first = segments.first()?;
        let last = segments.last()?;

        let overlap_prefix = std::mem::take(&mut self.next_overlap);
        let body = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text = if overlap_prefix.is_empty() {
            body
        } else {
            format!("{} {}", overlap_prefix, body)
        };

        self.next_overlap = last_words(&text, self.config.overlap_words);

        Some(Chunk {
            start_ms: first.timestamp_ms,
            end_ms: last.end_ms(),
            segments,
            text,
            overlap_prefix,
        })
    }
}

/// The last `n` whitespace-separated words of `text`, joined by single spaces.
fn last_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}
