//! Best-effort progress estimation for running generation cycles.
//!
//! Estimates are display-only: the orchestrator feeds elapsed time in and
//! emits whatever comes out, and nothing here can fail a cycle. Expected
//! duration is derived from how long recent cycles took per transcript word,
//! with a fixed guess before any history exists.

use std::collections::VecDeque;

/// Samples of completed cycles retained for the rolling rate.
const HISTORY_LEN: usize = 8;

/// Per-word cost assumed before the first cycle completes (ms).
const DEFAULT_MS_PER_WORD: f64 = 25.0;

/// Floor on any duration estimate (ms); tiny chunks still take a round trip.
const MIN_ESTIMATE_MS: f64 = 1_500.0;

#[derive(Debug, Default)]
pub struct ProgressEstimator {
    /// ms-per-word samples from completed cycles, newest last
    rates: VecDeque<f64>,
    /// Expected duration of the cycle in flight (ms)
    expected_ms: Option<f64>,
    /// Reported progress never goes backwards within a cycle
    last_percent: u8,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a cycle over `word_count` words of transcript.
    pub fn begin(&mut self, word_count: usize) {
        let rate = if self.rates.is_empty() {
            DEFAULT_MS_PER_WORD
        } else {
            self.rates.iter().sum::<f64>() / self.rates.len() as f64
        };
        let expected = (word_count.max(1) as f64 * rate).max(MIN_ESTIMATE_MS);
        self.expected_ms = Some(expected);
        self.last_percent = 0;
    }

    /// Progress in percent for the cycle in flight, monotonic and capped at
    /// 99 until [`complete`](Self::complete) is called. Returns 0 when no
    /// cycle is being tracked.
    pub fn percent(&mut self, elapsed_ms: u64) -> u8 {
        let Some(expected) = self.expected_ms else {
            return 0;
        };
        let raw = (elapsed_ms as f64 / expected * 100.0).min(99.0) as u8;
        self.last_percent = self.last_percent.max(raw);
        self.last_percent
    }

    /// Remaining time estimate for the cycle in flight (ms). `None` when no
    /// cycle is tracked or the estimate is already exhausted.
    pub fn eta_ms(&self, elapsed_ms: u64) -> Option<u64> {
        let expected = self.expected_ms?;
        let remaining = expected - elapsed_ms as f64;
        (remaining > 0.0).then_some(remaining as u64)
    }

    /// Record a finished cycle so future estimates learn from it.
    pub fn complete(&mut self, word_count: usize, actual_ms: u64) {
        if actual_ms > 0 {
            self.rates
                .push_back(actual_ms as f64 / word_count.max(1) as f64);
            if self.rates.len() > HISTORY_LEN {
                self.rates.pop_front();
            }
        }
        self.expected_ms = None;
        self.last_percent = 0;
    }

    /// Discard the in-flight estimate without recording a sample. Used when
    /// a cycle fails or is cancelled.
    pub fn abandon(&mut self) {
        self.expected_ms = None;
        self.last_percent = 0;
    }
}
