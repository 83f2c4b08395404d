//! Test doubles for infrastructure adapters.

pub mod clock;

pub use clock::MockClock;
