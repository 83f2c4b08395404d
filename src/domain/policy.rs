//! Flood policy applied to every tracked identity.

use std::time::Duration;

/// The numbers an [`IdentityStatus`](crate::domain::status::IdentityStatus)
/// is judged against.
///
/// This is a copy of the limiter configuration taken at the start of each
/// decision, so setters never race with a decision in progress.
///
/// # Example
/// ```
/// use flood_throttle::FloodPolicy;
/// use std::time::Duration;
///
/// let policy = FloodPolicy::new(Duration::from_secs(10), Duration::from_secs(30), 3)
///     .strict(true);
/// assert_eq!(policy.max_count, 3);
/// assert!(policy.strict);
/// assert_eq!(policy.retention(), Duration::from_secs(40));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodPolicy {
    /// Window inside which messages are counted
    pub window: Duration,
    /// How long an identity stays limited
    pub punishment: Duration,
    /// Messages allowed per window; the next one limits the identity
    pub max_count: usize,
    /// Reset the punishment clock on every event while limited
    pub strict: bool,
}

impl FloodPolicy {
    /// Create a non-strict policy.
    pub fn new(window: Duration, punishment: Duration, max_count: usize) -> Self {
        Self {
            window,
            punishment,
            max_count,
            strict: false,
        }
    }

    /// Set strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// How long a status can matter after its last window began.
    pub fn retention(&self) -> Duration {
        self.window.saturating_add(self.punishment)
    }
}

impl Default for FloodPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60), 5)
    }
}
