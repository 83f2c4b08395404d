//! Wall-clock adapter.
//!
//! Tests use `MockClock` from `crate::infrastructure::mocks` instead, which
//! is available in test builds or with the `test-helpers` feature.

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
