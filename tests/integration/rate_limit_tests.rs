/*!
 * Call ceilings observed by the service across jobs
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use pagewright::app_config::Config;
use pagewright::translation::RateLimiter;

use crate::common::{self, mock_providers};

fn limited_config() -> Config {
    let mut config = common::fast_config();
    config.rate_limit.window_secs = 30;
    config.rate_limit.max_calls_per_window = 4;
    config.rate_limit.min_spacing_ms = 2_000;
    config
}

/// For every i, call i+N arrives at least one window after call i
fn assert_ceiling(times: &[Instant], window: Duration, max_calls: usize) {
    for i in 0..times.len().saturating_sub(max_calls) {
        let span = times[i + max_calls] - times[i];
        assert!(span >= window, "calls {}..={} within {:?}", i, i + max_calls, span);
    }
}

fn assert_spacing(times: &[Instant], spacing: Duration) {
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= spacing);
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_withManyUnits_shouldRespectCeilingAndSpacing() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let texts = common::sample_texts();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    let job = common::body_job("paced", &texts, "fr", &dir.path().join("out.json"));
    let config = limited_config();
    let mock = mock_providers::uppercase_translator();
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &config);
    let start = Instant::now();

    let outcome = engine.run(&job).await.unwrap();

    assert!(outcome.is_completed());
    let times: Vec<Instant> = mock.calls().iter().map(|c| c.at).collect();
    assert_eq!(times.len(), 10);
    assert_ceiling(&times, config.rate_limit.window(), 4);
    assert_spacing(&times, config.rate_limit.min_spacing());
    // Two full windows must pass before the ninth call
    assert!(times[8] - start >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_runAll_withSharedLimiter_shouldKeepGlobalCeiling() {
    let dir = common::create_temp_dir().unwrap();
    let config = limited_config();
    let mock = mock_providers::uppercase_translator();
    let engine = common::engine_with(Arc::new(mock.clone()), dir.path(), &config);
    let jobs: Vec<_> = (0..3)
        .map(|j| {
            let id = format!("job-{}", j);
            let texts = ["one.", "two.", "three.", "four."];
            common::body_job(&id, &texts, "fr", &dir.path().join(format!("{}.json", id)))
        })
        .collect();

    let outcomes = engine.run_all(&jobs).await;

    assert!(outcomes.iter().all(|o| o.as_ref().unwrap().is_completed()));
    let times: Vec<Instant> = mock.calls().iter().map(|c| c.at).collect();
    assert_eq!(times.len(), 12);
    assert_ceiling(&times, config.rate_limit.window(), 4);
    assert_spacing(&times, config.rate_limit.min_spacing());
}

#[tokio::test(start_paused = true)]
async fn test_separateEngines_sharingOneLimiter_shouldKeepGlobalCeiling() {
    let dir = common::create_temp_dir().unwrap();
    let config = limited_config();
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let first_mock = mock_providers::uppercase_translator();
    let second_mock = mock_providers::uppercase_translator();
    let first = common::engine_with_limiter(Arc::new(first_mock.clone()), Arc::clone(&limiter), dir.path(), &config);
    let second = common::engine_with_limiter(Arc::new(second_mock.clone()), Arc::clone(&limiter), dir.path(), &config);
    let texts = ["a.", "b.", "c.", "d.", "e."];
    let job_a = common::body_job("a", &texts, "fr", &dir.path().join("a.json"));
    let job_b = common::body_job("b", &texts, "fr", &dir.path().join("b.json"));

    let (a, b) = tokio::join!(first.run(&job_a), second.run(&job_b));

    assert!(a.unwrap().is_completed());
    assert!(b.unwrap().is_completed());
    let mut times: Vec<Instant> = first_mock
        .calls()
        .iter()
        .chain(second_mock.calls().iter())
        .map(|c| c.at)
        .collect();
    times.sort();
    assert_ceiling(&times, config.rate_limit.window(), 4);
    assert_spacing(&times, config.rate_limit.min_spacing());
    assert_eq!(limiter.stats().await.admitted, 10);
}
