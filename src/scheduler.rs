//! Rate-limited, retrying FIFO scheduler for outbound generation calls.
//!
//! One worker task per scheduler drains a single queue. While a request is
//! executing the loop blocks, so there are never overlapping in-flight
//! calls — throughput is not the bottleneck, the remote quota is. A retried
//! request stays at the head of its own attempt cycle rather than re-entering
//! the tail of the queue.
//!
//! The scheduler may be shared process-wide (wrap it in `Arc`): the remote
//! quota is global, and all admission accounting goes through the one worker.

use crate::config::SchedulerConfig;
use crate::error::{Result, SumvoxError};
use crate::generator::TextGenerator;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until, timeout};

/// A boxed future producing the raw model response.
pub type GenerateFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// A retryable request thunk: called once per attempt, producing a fresh
/// future each time.
pub type RequestFn = Box<dyn Fn() -> GenerateFuture + Send>;

struct QueuedRequest {
    request: RequestFn,
    enqueued_at: Instant,
    attempt: u32,
    result_tx: oneshot::Sender<Result<String>>,
}

/// Serializes all outbound generation calls through one FIFO queue with a
/// sliding-window requests-per-minute limit and exponential-backoff retries.
pub struct RequestScheduler {
    tx: mpsc::UnboundedSender<QueuedRequest>,
    pending: Arc<AtomicUsize>,
    window_len: Arc<AtomicUsize>,
}

impl RequestScheduler {
    /// Spawns the worker task on the current tokio runtime.
    pub fn new(config: SchedulerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let window_len = Arc::new(AtomicUsize::new(0));

        let worker_pending = pending.clone();
        let worker_window = window_len.clone();
        tokio::spawn(run_worker(rx, config, worker_pending, worker_window));

        Self {
            tx,
            pending,
            window_len,
        }
    }

    /// Enqueues a request thunk and waits for its final result.
    ///
    /// Resolves after the call succeeds or retries are exhausted; the caller
    /// decides fallback behavior (typically: keep the previous summary).
    pub async fn submit(&self, request: RequestFn) -> Result<String> {
        let (result_tx, result_rx) = oneshot::channel();
        let queued = QueuedRequest {
            request,
            enqueued_at: Instant::now(),
            attempt: 0,
            result_tx,
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(queued).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SumvoxError::SchedulerShutDown);
        }
        match result_rx.await {
            Ok(result) => result,
            Err(_) => Err(SumvoxError::SchedulerShutDown),
        }
    }

    /// Convenience wrapper: schedule one `generate` call against `generator`.
    pub async fn generate(
        &self,
        generator: Arc<dyn TextGenerator>,
        prompt: String,
    ) -> Result<String> {
        self.submit(Box::new(move || {
            let generator = generator.clone();
            let prompt = prompt.clone();
            Box::pin(async move { generator.generate(&prompt).await })
        }))
        .await
    }

    /// Requests queued or executing (load report).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Attempts started within the current admission window (load report).
    pub fn window_len(&self) -> usize {
        self.window_len.load(Ordering::SeqCst)
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedRequest>,
    config: SchedulerConfig,
    pending: Arc<AtomicUsize>,
    window_gauge: Arc<AtomicUsize>,
) {
    let window_width = Duration::from_millis(crate::defaults::ADMISSION_WINDOW_MS);
    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let mut window: VecDeque<Instant> = VecDeque::new();

    while let Some(mut req) = rx.recv().await {
        loop {
            admit(&mut window, config.requests_per_minute, window_width).await;
            // Every attempt is a real remote call, so every attempt counts
            // against the quota.
            window.push_back(Instant::now());
            window_gauge.store(window.len(), Ordering::SeqCst);

            let outcome = match timeout(request_timeout, (req.request)()).await {
                Ok(result) => result,
                Err(_) => Err(SumvoxError::RequestTimeout {
                    seconds: config.request_timeout_secs,
                }),
            };

            match outcome {
                Ok(text) => {
                    // Receiver may have been cancelled; result is discarded then.
                    let _ = req.result_tx.send(Ok(text));
                    break;
                }
                Err(e) if e.is_transient() && req.attempt < config.max_retries => {
                    let delay = backoff_delay(&config, req.attempt);
                    eprintln!(
                        "sumvox: generation attempt {} failed ({}), retrying in {}ms",
                        req.attempt + 1,
                        e,
                        delay.as_millis()
                    );
                    sleep_until(Instant::now() + delay).await;
                    req.attempt += 1;
                }
                Err(e) => {
                    let _ = req.result_tx.send(Err(e));
                    break;
                }
            }
        }
        let waited = req.enqueued_at.elapsed();
        if waited > window_width {
            eprintln!(
                "sumvox: request spent {}s queued behind the rate limit",
                waited.as_secs()
            );
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sleeps until an attempt slot is free in the sliding window. Never
/// busy-spins: when the window is full it sleeps exactly until the oldest
/// timestamp ages out, then re-checks.
async fn admit(window: &mut VecDeque<Instant>, limit: usize, width: Duration) {
    loop {
        let now = Instant::now();
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= width {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() < limit {
            return;
        }
        if let Some(&oldest) = window.front() {
            sleep_until(oldest + width).await;
        }
    }
}

fn backoff_delay(config: &SchedulerConfig, attempt: u32) -> Duration {
    let delay = config
        .base_retry_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_retry_delay_ms);
    Duration::from_millis(delay)
}
