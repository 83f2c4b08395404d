//! Error types.
//!
//! Admission itself never fails; these cover construction and the
//! out-of-band operations around it.

use thiserror::Error;

/// Error returned when building a `Limiter` fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The counting window must be longer than zero
    #[error("window must be greater than 0")]
    ZeroWindow,
    /// At least one message per window must be allowed
    #[error("max_count must be greater than 0")]
    ZeroMaxCount,
}

/// Error returned by limiter lifecycle and override operations.
#[derive(Debug, Error)]
pub enum LimiterError {
    /// The operation needs a running limiter
    #[error("limiter is not running")]
    NotRunning,
    /// `start` was called outside a tokio runtime
    #[error("no tokio runtime available to spawn the reaper")]
    NoRuntime,
    /// The reaper task panicked or was aborted
    #[error("reaper task failed: {0}")]
    ReaperJoin(#[from] tokio::task::JoinError),
}
