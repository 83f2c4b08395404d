//! Shared helpers for integration tests.

#![allow(dead_code)]

pub use flood_throttle::infrastructure::mocks::MockClock;
use flood_throttle::{Limiter, Update};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A mock clock starting now.
pub fn mock_clock() -> MockClock {
    MockClock::new(Instant::now())
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

pub fn millis(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// window=10s, punishment=30s, max_count=3.
pub fn scenario_limiter(clock: &MockClock) -> Limiter<Update> {
    Limiter::builder()
        .with_window(secs(10))
        .with_punishment(secs(30))
        .with_max_count(3)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

pub fn text(chat: i64, sender: i64) -> Update {
    Update::message(chat, sender).with_text("spam")
}
