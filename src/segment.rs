//! Transcript segments and the per-session segment store.
//!
//! The store is pure data: it absorbs noisy recognition events (clamping bad
//! confidence values, ignoring empty text, tolerating duplicate or
//! out-of-order interim/final events) and never fails.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One unit of recognized speech text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Unique within a session, assigned by the store.
    pub id: u64,
    pub text: String,
    /// Session-relative monotonic timestamp (ms).
    pub timestamp_ms: u64,
    /// Recognition confidence, clamped to 0.0..=1.0.
    pub confidence: f32,
    pub is_final: bool,
    pub duration_ms: u64,
}

impl TranscriptSegment {
    /// End of the segment on the session timeline (ms).
    pub fn end_ms(&self) -> u64 {
        self.timestamp_ms + self.duration_ms
    }

    /// Whitespace-separated word count.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Ordered transcript segments for one session.
///
/// At most one interim segment exists at a time; it is overwritten in place
/// until finalized. Final segments are immutable and append-only.
#[derive(Debug, Default)]
pub struct SegmentStore {
    finals: Vec<Arc<TranscriptSegment>>,
    interim: Option<TranscriptSegment>,
    next_id: u64,
    /// Final segments dropped from the front by compaction.
    compacted: u64,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current interim segment with new text.
    ///
    /// Empty text is ignored. An interim that duplicates the text of the most
    /// recent final segment is treated as a stale recognizer echo and dropped.
    pub fn append_interim(&mut self, text: &str, confidence: f32, timestamp_ms: u64) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.finals.last()
            && last.text == text
        {
            return;
        }

        let id = match &self.interim {
            Some(existing) => existing.id,
            None => self.take_id(),
        };
        self.interim = Some(TranscriptSegment {
            id,
            text: text.to_string(),
            timestamp_ms,
            confidence: clamp_confidence(confidence),
            is_final: false,
            duration_ms: 0,
        });
    }

    /// Converts the pending interim into a final segment, or creates one
    /// directly if no interim exists. Clears interim state.
    ///
    /// Idempotent: a duplicate finalize (same text and timestamp as the last
    /// committed final, with no interim pending) is a no-op and returns the
    /// existing segment id.
    pub fn finalize(
        &mut self,
        text: &str,
        confidence: f32,
        timestamp_ms: u64,
        duration_ms: u64,
    ) -> Option<u64> {
        let refined = text.trim();

        // Finalize may refine the interim's text; fall back to the interim
        // text when the final event arrives empty.
        let (id, text) = match self.interim.take() {
            Some(interim) => {
                let text = if refined.is_empty() {
                    interim.text
                } else {
                    refined.to_string()
                };
                (interim.id, text)
            }
            None => {
                if refined.is_empty() {
                    return None;
                }
                if let Some(last) = self.finals.last()
                    && last.text == refined
                    && last.timestamp_ms == timestamp_ms
                {
                    return Some(last.id);
                }
                (self.take_id(), refined.to_string())
            }
        };

        if text.is_empty() {
            return None;
        }

        let segment = Arc::new(TranscriptSegment {
            id,
            text,
            timestamp_ms,
            confidence: clamp_confidence(confidence),
            is_final: true,
            duration_ms,
        });
        self.finals.push(segment);
        Some(id)
    }

    /// The immutable ordered list of final segments currently retained.
    pub fn final_segments(&self) -> &[Arc<TranscriptSegment>] {
        &self.finals
    }

    /// Final segments from an absolute finalize index onward.
    ///
    /// Absolute indices count every segment ever finalized, so they stay
    /// valid across compaction.
    pub fn segments_from(&self, abs_index: u64) -> &[Arc<TranscriptSegment>] {
        let rel = abs_index.saturating_sub(self.compacted) as usize;
        &self.finals[rel.min(self.finals.len())..]
    }

    /// Total number of segments ever finalized in this session.
    pub fn total_finalized(&self) -> u64 {
        self.compacted + self.finals.len() as u64
    }

    /// The current interim segment, if any.
    pub fn interim(&self) -> Option<&TranscriptSegment> {
        self.interim.as_ref()
    }

    /// Number of retained final segments.
    pub fn len(&self) -> usize {
        self.finals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finals.is_empty()
    }

    /// Total word count across retained final segments.
    pub fn word_count(&self) -> usize {
        self.finals.iter().map(|s| s.word_count()).sum()
    }

    /// Drops the oldest retained segments that are already covered by a
    /// summary, keeping the store under `max_retained_segments`.
    ///
    /// `covered_abs` is the absolute finalize index up to which segments have
    /// been summarized; un-summarized text is never evicted.
    pub fn compact(&mut self, covered_abs: u64) {
        self.compact_to(covered_abs, defaults::MAX_RETAINED_SEGMENTS);
    }

    /// `compact` with an explicit retention bound.
    pub fn compact_to(&mut self, covered_abs: u64, max_retained: usize) {
        while self.finals.len() > max_retained && self.compacted < covered_abs {
            self.finals.remove(0);
            self.compacted += 1;
        }
    }

    /// Resets both lists. Used on session clear/restart.
    pub fn clear(&mut self) {
        self.finals.clear();
        self.interim = None;
        self.next_id = 0;
        self.compacted = 0;
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Upstream recognition noise is expected: NaN and out-of-range confidence
/// values are clamped rather than rejected.
fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
