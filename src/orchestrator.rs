//! Drives the full pipeline: recognition events in, running summaries out.
//!
//! The orchestrator owns the segment store, chunk builder, prompt composer,
//! parser, and merger, and borrows a shared scheduler for outbound calls.
//! All collaborators are injected at construction so tests can substitute a
//! mock generator and a tight trigger policy.
//!
//! A generation cycle is atomic from the caller's perspective: it either
//! produces a new running summary or leaves the previous one untouched. The
//! summarized-up-to cursor only advances on success, so failed cycles retry
//! the same transcript text later.

use crate::chunk::{Chunk, ChunkBuilder};
use crate::config::Config;
use crate::error::{Result, SumvoxError};
use crate::events::{EventSender, PipelineEvent};
use crate::generator::TextGenerator;
use crate::merge::{SummaryMerger, SummaryStamp};
use crate::parser::ResponseParser;
use crate::progress::ProgressEstimator;
use crate::prompt::PromptComposer;
use crate::scheduler::RequestScheduler;
use crate::segment::SegmentStore;
use crate::summary::{RunningSummary, SummaryFragment};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation for the cycle in flight.
///
/// Setting the flag does not abort the outbound call; the result is awaited
/// and then discarded, leaving the previous summary in place.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Idle,
    Generating,
}

pub struct SummarizationOrchestrator {
    config: Config,
    store: SegmentStore,
    chunker: ChunkBuilder,
    composer: PromptComposer,
    parser: ResponseParser,
    merger: SummaryMerger,
    progress: ProgressEstimator,
    generator: Arc<dyn TextGenerator>,
    scheduler: Arc<RequestScheduler>,
    events: Option<EventSender>,
    cancel: CancelToken,
    state: PipelineState,
    paused: bool,
    summary: Option<RunningSummary>,
    next_summary_id: u64,
    /// Absolute finalize index covered by the current summary.
    covered: u64,
    /// Chunks closed but not yet summarized.
    ready: Vec<Chunk>,
}

impl SummarizationOrchestrator {
    pub fn new(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        scheduler: Arc<RequestScheduler>,
    ) -> Self {
        let chunker = ChunkBuilder::new(config.chunking.clone());
        let composer = PromptComposer::new()
            .with_custom_instructions(config.prompt.custom_instructions.clone());
        let parser = ResponseParser::new(config.merge.max_content_words);
        let merger = SummaryMerger::new(config.merge.clone());
        Self {
            config,
            store: SegmentStore::new(),
            chunker,
            composer,
            parser,
            merger,
            progress: ProgressEstimator::new(),
            generator,
            scheduler,
            events: None,
            cancel: CancelToken::default(),
            state: PipelineState::Idle,
            paused: false,
            summary: None,
            next_summary_id: 1,
            covered: 0,
            ready: Vec::new(),
        }
    }

    /// Attach an event channel for pipeline observers.
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Handle to cancel the cycle in flight from another task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Feed an interim recognition result. Interim text refines in place and
    /// never reaches the chunker.
    pub fn handle_interim(&mut self, text: &str, confidence: f32, timestamp_ms: u64) {
        self.store.append_interim(text, confidence, timestamp_ms);
    }

    /// Feed a final recognition result. Commits the segment and accumulates
    /// it toward the next chunk.
    pub fn handle_final(
        &mut self,
        text: &str,
        confidence: f32,
        timestamp_ms: u64,
        duration_ms: u64,
    ) {
        let before = self.store.total_finalized();
        let Some(segment_id) = self.store.finalize(text, confidence, timestamp_ms, duration_ms)
        else {
            return;
        };
        if self.store.total_finalized() == before {
            // Duplicate finalize; already chunked.
            return;
        }

        let segment = match self.store.final_segments().last() {
            Some(segment) => segment.clone(),
            None => return,
        };
        self.emit(PipelineEvent::SegmentFinalized {
            segment_id,
            word_count: segment.word_count(),
        });
        if let Some(chunk) = self.chunker.add_final_segment(segment) {
            self.ready.push(chunk);
        }
    }

    /// Run a generation cycle if the trigger policy is satisfied.
    ///
    /// `now_ms` is the session-relative clock. Returns `Ok(true)` when a new
    /// summary was produced. A trigger while a cycle runs, while paused, or
    /// before the thresholds are met is a no-op.
    pub async fn maybe_generate(&mut self, now_ms: u64) -> Result<bool> {
        if !self.should_trigger(now_ms) {
            return Ok(false);
        }
        self.generate_now(now_ms).await
    }

    /// Run a generation cycle immediately, ignoring trigger thresholds.
    /// Still a no-op while paused, mid-cycle, or with nothing to summarize.
    pub async fn generate_now(&mut self, now_ms: u64) -> Result<bool> {
        if self.paused || self.state == PipelineState::Generating {
            return Ok(false);
        }

        let mut chunks = std::mem::take(&mut self.ready);
        if let Some(partial) = self.chunker.flush() {
            chunks.push(partial);
        }
        if chunks.is_empty() {
            return Ok(false);
        }

        self.state = PipelineState::Generating;
        let covered_target = self.store.total_finalized();
        let outcome = self.run_cycle(&chunks, now_ms).await;
        self.state = PipelineState::Idle;

        match outcome {
            Ok(summary) => {
                self.emit(PipelineEvent::GenerationSucceeded {
                    summary_id: summary.id,
                    is_incremental: summary.is_incremental,
                    processing_time_ms: summary.processing_time_ms,
                });
                self.summary = Some(summary);
                self.covered = covered_target;
                self.store.compact(self.covered);
                Ok(true)
            }
            Err(e) => {
                // The previous summary stands; put the chunks back so the
                // same transcript is retried next cycle.
                self.progress.abandon();
                chunks.extend(self.ready.drain(..));
                self.ready = chunks;
                if matches!(e, SumvoxError::Cancelled) {
                    self.cancel.reset();
                } else {
                    self.emit(PipelineEvent::GenerationFailed {
                        message: e.to_string(),
                        permanent: e.is_permanent(),
                    });
                }
                Err(e)
            }
        }
    }

    /// End-of-session: summarize whatever remains, thresholds ignored.
    pub async fn finish(&mut self, now_ms: u64) -> Result<bool> {
        self.generate_now(now_ms).await
    }

    /// Suspend automatic and explicit generation. Segments keep accumulating.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Discard transcript, pending chunks, and the running summary.
    pub fn clear(&mut self) {
        self.store.clear();
        self.chunker.reset();
        self.ready.clear();
        self.summary = None;
        self.next_summary_id = 1;
        self.covered = 0;
        self.progress = ProgressEstimator::new();
    }

    /// The current running summary, if any cycle has succeeded.
    pub fn summary(&self) -> Option<&RunningSummary> {
        self.summary.as_ref()
    }

    /// The current summary rendered as plain text, for export.
    pub fn summary_text(&self) -> Option<String> {
        self.summary.as_ref().map(|s| s.to_plain_text())
    }

    pub fn transcript(&self) -> &SegmentStore {
        &self.store
    }

    /// Unsummarized final segments waiting for the next cycle.
    pub fn backlog_segments(&self) -> usize {
        self.store.segments_from(self.covered).len()
    }

    fn should_trigger(&self, now_ms: u64) -> bool {
        if self.paused || self.state == PipelineState::Generating {
            return false;
        }
        let backlog = self.store.segments_from(self.covered);
        if backlog.len() < self.config.trigger.min_segments {
            return false;
        }
        let words: usize = backlog.iter().map(|s| s.word_count()).sum();
        if words < self.config.trigger.min_words {
            return false;
        }
        // The interval runs from the last successful summary; a failed or
        // cancelled cycle does not delay the retry.
        match &self.summary {
            Some(previous) => {
                now_ms.saturating_sub(previous.generated_at_ms) >= self.config.trigger.interval_ms
            }
            None => true,
        }
    }

    async fn run_cycle(&mut self, chunks: &[Chunk], now_ms: u64) -> Result<RunningSummary> {
        let started = std::time::Instant::now();
        let cycle_words: usize = chunks.iter().map(|c| c.word_count()).sum();
        self.progress.begin(cycle_words);
        self.emit(PipelineEvent::GenerationStarted {
            chunk_count: chunks.len(),
        });

        let mut fragments = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = match (&self.summary, i) {
                (Some(previous), 0) => self.composer.compose_incremental(&chunk.text, previous),
                _ => self.composer.compose_fresh(&chunk.text),
            };
            let raw = self.checked_generate(prompt).await?;
            fragments.push(self.parser.parse(&raw));

            let elapsed = started.elapsed().as_millis() as u64;
            let percent = self.progress.percent(elapsed);
            let eta_ms = self.progress.eta_ms(elapsed);
            self.emit(PipelineEvent::GenerationProgress { percent, eta_ms });
        }

        let combined = if fragments.len() == 1 {
            fragments.into_iter().next().unwrap_or_default()
        } else {
            self.consolidate(fragments).await?
        };

        let processing_time_ms = started.elapsed().as_millis() as u64;
        self.progress.complete(cycle_words, processing_time_ms);

        let stamp = SummaryStamp {
            id: self.take_summary_id(),
            generated_at_ms: now_ms,
            processing_time_ms,
        };
        let summary = match &self.summary {
            Some(previous) => self.merger.merge_incremental(previous, combined, stamp),
            None => {
                let capped = self.merger.merge_many(std::slice::from_ref(&combined));
                let mut fresh = RunningSummary::fresh(stamp.id, capped, stamp.generated_at_ms);
                fresh.processing_time_ms = stamp.processing_time_ms;
                fresh
            }
        };
        Ok(summary)
    }

    /// Consolidate a multi-chunk batch into one fragment with an extra model
    /// call; a transient failure there degrades to pure merging instead of
    /// failing the whole cycle.
    async fn consolidate(&mut self, fragments: Vec<SummaryFragment>) -> Result<SummaryFragment> {
        let prompt = self.composer.compose_consolidation(&fragments);
        match self.checked_generate(prompt).await {
            Ok(raw) => Ok(self.parser.parse(&raw)),
            Err(SumvoxError::Cancelled) => Err(SumvoxError::Cancelled),
            Err(e) => {
                eprintln!("sumvox: consolidation call failed ({e}), merging fragments directly");
                Ok(self.merger.merge_many(&fragments))
            }
        }
    }

    /// One scheduled generation call, honoring cancellation on both sides of
    /// the await.
    async fn checked_generate(&self, prompt: String) -> Result<String> {
        if self.cancel.is_cancelled() {
            return Err(SumvoxError::Cancelled);
        }
        let raw = self
            .scheduler
            .generate(self.generator.clone(), prompt)
            .await?;
        if self.cancel.is_cancelled() {
            return Err(SumvoxError::Cancelled);
        }
        Ok(raw)
    }

    fn take_summary_id(&mut self) -> u64 {
        let id = self.next_summary_id;
        self.next_summary_id += 1;
        id
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }
}
