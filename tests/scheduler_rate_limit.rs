//! Rate-limit behavior across full generation cycles, under paused tokio
//! time so the sliding-window waits run instantly and deterministically.

use std::sync::Arc;

use sumvox::config::{Config, SchedulerConfig, TriggerConfig};
use sumvox::{MockGenerator, RequestScheduler, SummarizationOrchestrator};
use tokio::time::{Duration, Instant};

const RESPONSE: &str = r#"{"content": "short recap", "key_points": ["one point"]}"#;

fn tight_config() -> Config {
    Config {
        scheduler: SchedulerConfig {
            requests_per_minute: 2,
            max_retries: 0,
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 1,
            request_timeout_secs: 30,
        },
        trigger: TriggerConfig {
            min_segments: 1,
            min_words: 1,
            interval_ms: 0,
        },
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn cycles_beyond_quota_wait_for_the_window() {
    let config = tight_config();
    let scheduler = Arc::new(RequestScheduler::new(config.scheduler.clone()));
    let generator = Arc::new(MockGenerator::new("mock").with_response(RESPONSE));
    let mut orch = SummarizationOrchestrator::new(config, generator.clone(), scheduler);

    let t0 = Instant::now();
    let mut cycle_ends = Vec::new();
    for i in 0..4u64 {
        orch.handle_final(&format!("cycle {i} content"), 0.9, i * 2_000, 1_000);
        assert!(orch.generate_now(i * 2_000).await.unwrap());
        cycle_ends.push(t0.elapsed());
    }
    assert_eq!(generator.call_count(), 4);

    let minute = Duration::from_secs(60);
    // Two cycles fit in the first window; the third and fourth each wait for
    // an earlier attempt to age out.
    assert!(cycle_ends[1] < minute);
    assert!(cycle_ends[2] >= minute, "third cycle ran at {:?}", cycle_ends[2]);
    assert!(cycle_ends[3] >= minute, "fourth cycle ran at {:?}", cycle_ends[3]);

    // Summaries still chained correctly despite the waits
    let summary = orch.summary().unwrap();
    assert!(summary.is_incremental);
    assert_eq!(summary.id, 4);
}

#[tokio::test(start_paused = true)]
async fn shared_scheduler_accounts_quota_across_pipelines() {
    // Two orchestrators over one scheduler: the quota is global, so four
    // combined cycles behave like four requests from one pipeline.
    let config = tight_config();
    let scheduler = Arc::new(RequestScheduler::new(config.scheduler.clone()));
    let generator = Arc::new(MockGenerator::new("mock").with_response(RESPONSE));
    let mut a =
        SummarizationOrchestrator::new(config.clone(), generator.clone(), scheduler.clone());
    let mut b = SummarizationOrchestrator::new(config, generator.clone(), scheduler);

    let t0 = Instant::now();
    a.handle_final("first pipeline speaks", 0.9, 0, 1_000);
    a.generate_now(0).await.unwrap();
    b.handle_final("second pipeline speaks", 0.9, 0, 1_000);
    b.generate_now(0).await.unwrap();
    assert!(t0.elapsed() < Duration::from_secs(60));

    a.handle_final("first again", 0.9, 2_000, 1_000);
    a.generate_now(2_000).await.unwrap();
    assert!(
        t0.elapsed() >= Duration::from_secs(60),
        "third combined request must wait for the shared window"
    );
}

#[tokio::test(start_paused = true)]
async fn retry_attempts_count_against_the_quota() {
    // limit 3/min, one request failing twice before success: all three
    // attempts land in the window, so a following request must wait.
    let config = SchedulerConfig {
        requests_per_minute: 3,
        max_retries: 3,
        base_retry_delay_ms: 10,
        max_retry_delay_ms: 20,
        request_timeout_secs: 30,
    };
    let scheduler = RequestScheduler::new(config);
    let generator = Arc::new(
        MockGenerator::new("flaky")
            .with_scripted_failure(sumvox::SumvoxError::ServiceUnavailable {
                message: "busy".into(),
            })
            .with_scripted_failure(sumvox::SumvoxError::ServiceUnavailable {
                message: "busy".into(),
            })
            .with_response(RESPONSE),
    );

    let t0 = Instant::now();
    scheduler
        .generate(generator.clone(), "first".into())
        .await
        .unwrap();
    assert_eq!(generator.call_count(), 3);
    assert!(t0.elapsed() < Duration::from_secs(60));

    scheduler
        .generate(generator.clone(), "second".into())
        .await
        .unwrap();
    assert!(
        t0.elapsed() >= Duration::from_secs(60),
        "window full from retries; next attempt waited, ran at {:?}",
        t0.elapsed()
    );
}
