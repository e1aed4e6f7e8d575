/*!
 * Tests for the shared rate limiter
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use pagewright::app_config::RateLimitConfig;
use pagewright::translation::RateLimiter;

/// No window of length `window` holds more than `max` calls
fn assert_ceiling(times: &[Instant], window: Duration, max: usize) {
    for (i, start) in times.iter().enumerate() {
        let in_window = times[i..].iter().take_while(|t| **t - *start < window).count();
        assert!(in_window <= max, "{} calls within {:?} starting at call {}", in_window, window, i);
    }
}

fn assert_spacing(times: &[Instant], spacing: Duration) {
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= spacing, "calls {:?} apart", pair[1] - pair[0]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_acquire_withBurst_shouldHoldCeilingAndSpacing() {
    let config = RateLimitConfig {
        window_secs: 60,
        max_calls_per_window: 5,
        min_spacing_ms: 4_000,
    };
    let limiter = RateLimiter::from_config(&config);

    let mut times = Vec::new();
    for _ in 0..17 {
        limiter.acquire().await;
        times.push(Instant::now());
    }

    assert_ceiling(&times, config.window(), 5);
    assert_spacing(&times, config.min_spacing());
}

#[tokio::test(start_paused = true)]
async fn test_acquire_withSpacingAlone_shouldStillRespectWindow() {
    // Spacing alone would allow 10 calls per window
    let limiter = RateLimiter::new(Duration::from_secs(10), 3, Duration::from_secs(1));
    let start = Instant::now();

    let mut times = Vec::new();
    for _ in 0..7 {
        limiter.acquire().await;
        times.push(Instant::now());
    }

    assert_ceiling(&times, Duration::from_secs(10), 3);
    assert_eq!(times[3] - start, Duration::from_secs(10));
    assert_eq!(times[6] - start, Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_acquire_withManyTasks_shouldAdmitInArrivalOrder() {
    let limiter = Arc::new(RateLimiter::new(Duration::from_secs(5), 2, Duration::from_millis(500)));
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for id in 0..8 {
        let limiter = Arc::clone(&limiter);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            limiter.acquire().await;
            order.lock().push((id, Instant::now()));
        }));
        // Let each task queue before the next is spawned
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let order = order.lock().clone();
    let ids: Vec<usize> = order.iter().map(|(id, _)| *id).collect();
    let times: Vec<Instant> = order.iter().map(|(_, t)| *t).collect();
    assert_eq!(ids, (0..8).collect::<Vec<_>>());
    assert_ceiling(&times, Duration::from_secs(5), 2);
    assert_spacing(&times, Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_stats_shouldReportWaiting() {
    let limiter = RateLimiter::new(Duration::from_secs(60), 10, Duration::from_secs(2));

    for _ in 0..3 {
        limiter.acquire().await;
    }
    let stats = limiter.stats().await;

    assert_eq!(stats.admitted, 3);
    assert_eq!(stats.delayed, 2);
    assert_eq!(stats.total_wait, Duration::from_secs(4));
    assert_eq!(stats.in_window, 3);
}

#[test]
fn test_acquire_withoutLimits_shouldNotBlock() {
    let limiter = RateLimiter::new(Duration::from_secs(1), 1000, Duration::ZERO);

    let waited = tokio_test::block_on(async {
        let mut total = Duration::ZERO;
        for _ in 0..50 {
            total += limiter.acquire().await;
        }
        total
    });

    assert_eq!(waited, Duration::ZERO);
}
