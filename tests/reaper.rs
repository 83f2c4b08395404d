//! Integration tests for background eviction.

mod common;

use common::{millis, mock_clock, secs, text, MockClock};
use flood_throttle::{Decision, Limiter, Update};
use std::sync::Arc;
use std::time::Duration;

fn limiter(clock: &MockClock) -> Limiter<Update> {
    Limiter::builder()
        .with_window(secs(10))
        .with_punishment(secs(30))
        .with_max_count(3)
        .with_max_cache_duration(secs(50))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_reaper_evicts_only_stale_identities() {
    let clock = mock_clock();
    let limiter = limiter(&clock);
    limiter.start().unwrap();

    for id in 1..=5 {
        limiter.admit(&text(-1, id));
    }
    for _ in 0..4 {
        limiter.admit(&text(-1, 6));
    }
    limiter.add_custom_ignore(7, Duration::ZERO, false).unwrap();
    assert_eq!(limiter.identity_count(), 7);

    clock.advance(secs(11));
    tokio::time::sleep(secs(51)).await;

    assert_eq!(limiter.identity_count(), 2);
    assert!(limiter.is_limited(6));
    assert!(limiter.status(7).unwrap().custom().is_some());
    assert_eq!(limiter.metrics().identities_evicted(), 5);

    limiter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reaper_keeps_active_window() {
    let clock = mock_clock();
    let limiter = limiter(&clock);
    limiter.start().unwrap();

    limiter.admit(&text(-1, 1));
    clock.advance(secs(5));
    tokio::time::sleep(secs(51)).await;
    assert_eq!(limiter.identity_count(), 1);

    clock.advance(secs(6));
    tokio::time::sleep(secs(50)).await;
    assert_eq!(limiter.identity_count(), 0);

    limiter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reaper_releases_expired_ignore_override() {
    let clock = mock_clock();
    let limiter = limiter(&clock);
    limiter.add_exception_ids([3]);
    limiter.start().unwrap();

    limiter.add_custom_ignore(3, secs(20), true).unwrap();
    assert!(limiter.is_ignored_exception(3));

    clock.advance(secs(21));
    tokio::time::sleep(secs(51)).await;

    assert!(limiter.status(3).is_none());
    assert!(!limiter.is_ignored_exception(3));
    assert_eq!(limiter.admit(&text(-1, 3)), Decision::PassThrough);

    limiter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reaper_corrects_subsecond_interval() {
    let clock = mock_clock();
    let limiter: Limiter<Update> = Limiter::builder()
        .with_window(millis(100))
        .with_punishment(millis(100))
        .with_max_cache_duration(millis(500))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    assert_eq!(limiter.max_cache_duration(), millis(500));

    limiter.start().unwrap();
    tokio::time::sleep(millis(1)).await;

    assert_eq!(limiter.max_cache_duration(), millis(60_200));
    limiter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_restarted_limiter_keeps_sweeping() {
    let clock = mock_clock();
    let limiter = limiter(&clock);
    limiter.start().unwrap();
    limiter.shutdown().await.unwrap();
    limiter.start().unwrap();

    limiter.admit(&text(-1, 1));
    clock.advance(secs(11));
    tokio::time::sleep(secs(51)).await;
    assert_eq!(limiter.identity_count(), 0);

    limiter.shutdown().await.unwrap();
}
