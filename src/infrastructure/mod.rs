//! Infrastructure layer - concrete adapters for the application ports.
//!
//! - `SystemClock` for production time
//! - `ShardedStorage`, a DashMap-backed `Storage`

pub mod clock;
pub mod storage;

/// Mock implementations for testing.
///
/// Only available in test builds or with the `test-helpers` feature:
/// ```toml
/// [dev-dependencies]
/// flood-throttle = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
