//! Limiter configuration and its builder.

use crate::application::hooks::{Filter, Trigger};
use crate::application::limiter::Limiter;
use crate::application::ports::{Clock, Storage};
use crate::domain::{event::IdentityId, policy::FloodPolicy, status::IdentityStatus};
use crate::error::BuildError;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use std::time::Duration;

/// Default counting window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
/// Default punishment.
pub const DEFAULT_PUNISHMENT: Duration = Duration::from_secs(60);
/// Default messages allowed per window.
pub const DEFAULT_MAX_COUNT: usize = 5;
/// Slack added on top of `window + punishment` for the reaper interval.
pub const REAPER_GRACE: Duration = Duration::from_secs(60);
/// Shortest reaper interval accepted before falling back to the default.
pub const MIN_REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Scalar limiter settings.
///
/// Exception lists and hooks are kept beside the configuration in the
/// limiter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Window inside which messages are counted
    pub window: Duration,
    /// How long a limited identity stays limited
    pub punishment: Duration,
    /// Messages allowed per window
    pub max_count: usize,
    /// How often the reaper sweeps the registry
    pub max_cache_duration: Duration,
    /// Reset the punishment clock on every event while limited
    pub strict: bool,
    /// Only evaluate events that carry text
    pub text_only: bool,
    /// Evaluate channel posts
    pub allow_channels: bool,
    /// Evaluate edited messages
    pub allow_edits: bool,
    /// Track senders rather than whole chats
    pub consider_user: bool,
}

impl LimiterConfig {
    /// The policy snapshot handed to the state machine.
    pub fn policy(&self) -> FloodPolicy {
        FloodPolicy::new(self.window, self.punishment, self.max_count).strict(self.strict)
    }

    /// `window + punishment + 1 minute`.
    pub fn default_interval(&self) -> Duration {
        self.policy().retention().saturating_add(REAPER_GRACE)
    }

    /// Set the reaper interval, clamping values that would not outlive a
    /// full window plus punishment.
    ///
    /// Returns `true` if the value was clamped.
    pub fn set_max_cache_duration(&mut self, d: Duration) -> bool {
        if d > self.policy().retention() {
            self.max_cache_duration = d;
            false
        } else {
            self.max_cache_duration = self.default_interval();
            true
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        let mut config = Self {
            window: DEFAULT_WINDOW,
            punishment: DEFAULT_PUNISHMENT,
            max_count: DEFAULT_MAX_COUNT,
            max_cache_duration: Duration::ZERO,
            strict: false,
            text_only: false,
            allow_channels: false,
            allow_edits: false,
            consider_user: true,
        };
        config.max_cache_duration = config.default_interval();
        config
    }
}

/// Builder for constructing a [`Limiter`].
///
/// # Example
/// ```
/// use flood_throttle::{Limiter, Update};
/// use std::time::Duration;
///
/// let limiter: Limiter<Update> = Limiter::builder()
///     .with_window(Duration::from_secs(10))
///     .with_punishment(Duration::from_secs(30))
///     .with_max_count(3)
///     .with_strict(true)
///     .build()
///     .unwrap();
///
/// assert!(limiter.is_strict());
/// assert_eq!(limiter.max_cache_duration(), Duration::from_secs(100));
/// ```
pub struct LimiterBuilder<E> {
    config: LimiterConfig,
    cache_duration: Option<Duration>,
    exception_ids: Vec<IdentityId>,
    clock: Option<Arc<dyn Clock>>,
    pub(crate) conditions: Vec<Filter<E>>,
    pub(crate) exceptions: Vec<Filter<E>>,
    pub(crate) triggers: Vec<Trigger<E>>,
}

impl<E> LimiterBuilder<E> {
    pub(crate) fn new() -> Self {
        Self {
            config: LimiterConfig::default(),
            cache_duration: None,
            exception_ids: Vec::new(),
            clock: None,
            conditions: Vec::new(),
            exceptions: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Set the counting window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Set the punishment duration.
    pub fn with_punishment(mut self, punishment: Duration) -> Self {
        self.config.punishment = punishment;
        self
    }

    /// Set how many messages are allowed per window.
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.config.max_count = max_count;
        self
    }

    /// Set the reaper interval.
    ///
    /// Applied after window and punishment at `build()` time, with the same
    /// clamping as [`Limiter::set_max_cache_duration`].
    pub fn with_max_cache_duration(mut self, d: Duration) -> Self {
        self.cache_duration = Some(d);
        self
    }

    /// Reset the punishment clock on every event while limited.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Only evaluate events that carry text.
    pub fn with_text_only(mut self, text_only: bool) -> Self {
        self.config.text_only = text_only;
        self
    }

    /// Evaluate channel posts.
    pub fn with_allow_channels(mut self, allow: bool) -> Self {
        self.config.allow_channels = allow;
        self
    }

    /// Evaluate edited messages.
    pub fn with_allow_edits(mut self, allow: bool) -> Self {
        self.config.allow_edits = allow;
        self
    }

    /// Track senders (`true`, default) or whole chats (`false`).
    pub fn with_consider_user(mut self, consider_user: bool) -> Self {
        self.config.consider_user = consider_user;
        self
    }

    /// Identities that are never evaluated.
    pub fn with_exception_ids(mut self, ids: Vec<IdentityId>) -> Self {
        self.exception_ids = ids;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Add a condition every evaluated event must satisfy.
    pub fn with_condition(
        mut self,
        condition: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    /// Add an exception predicate; matching events are not evaluated.
    pub fn with_exception(
        mut self,
        exception: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.exceptions.push(Arc::new(exception));
        self
    }

    /// Add a callback run when an identity becomes limited.
    pub fn with_trigger(mut self, trigger: impl Fn(&E) + Send + Sync + 'static) -> Self {
        self.triggers.push(Arc::new(trigger));
        self
    }

    /// Build a limiter backed by `ShardedStorage`.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build(self) -> Result<Limiter<E>, BuildError> {
        self.build_with_storage::<ShardedStorage<IdentityId, IdentityStatus>>()
    }

    /// Build a limiter backed by another storage implementation.
    ///
    /// A fresh `S::default()` is allocated on every `start`.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build_with_storage<S>(mut self) -> Result<Limiter<E, S>, BuildError>
    where
        S: Storage<IdentityId, IdentityStatus> + Default + 'static,
    {
        let mut config = self.config;
        if config.window.is_zero() {
            return Err(BuildError::ZeroWindow);
        }
        if config.max_count == 0 {
            return Err(BuildError::ZeroMaxCount);
        }

        match self.cache_duration {
            Some(d) => {
                config.set_max_cache_duration(d);
            }
            None => config.max_cache_duration = config.default_interval(),
        }

        let clock = self
            .clock
            .take()
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let exception_ids = std::mem::take(&mut self.exception_ids);
        Ok(Limiter::from_parts(config, exception_ids, clock, self))
    }
}

impl<E> std::fmt::Debug for LimiterBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterBuilder")
            .field("config", &self.config)
            .field("cache_duration", &self.cache_duration)
            .field("exception_ids", &self.exception_ids)
            .field("clock", &self.clock)
            .field("conditions", &self.conditions.len())
            .field("exceptions", &self.exceptions.len())
            .field("triggers", &self.triggers.len())
            .finish()
    }
}
