//! Per-identity flood bookkeeping.
//!
//! An [`IdentityStatus`] moves between three states:
//!
//! - **Fresh**: never counted, or its window is long over. Evictable.
//! - **Active**: counting messages inside the current window.
//! - **Limited**: exceeded the window threshold and serving its punishment.
//!
//! Independently of those, a status may carry a [`CustomIgnore`] override
//! installed out-of-band by the bot owner.

use crate::domain::policy::FloodPolicy;
use std::time::{Duration, Instant};

/// Outcome of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The event was not evaluated at all (limiter stopped, exempt, filtered out)
    PassThrough,
    /// The event was counted and is within limits
    Admitted,
    /// The identity is serving its punishment
    AlreadyLimited,
    /// This event pushed the identity over the limit
    NewlyLimited,
}

impl Decision {
    /// Whether downstream handlers should skip the event.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Decision::AlreadyLimited | Decision::NewlyLimited)
    }

    /// Whether the event bypassed flood evaluation.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Decision::PassThrough)
    }

    /// Whether the event went through the window/count state machine.
    pub fn is_evaluated(&self) -> bool {
        !self.is_pass_through()
    }
}

/// A time-bounded forced pass-through for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomIgnore {
    /// When the override was installed
    pub start: Instant,
    /// How long it lasts; zero means indefinitely
    pub duration: Duration,
    /// Keep evaluating the identity even if it is in the exception list
    pub ignore_exceptions: bool,
}

impl CustomIgnore {
    pub fn new(start: Instant, duration: Duration, ignore_exceptions: bool) -> Self {
        Self {
            start,
            duration,
            ignore_exceptions,
        }
    }

    /// The override covers `[start, start + duration)`.
    pub fn is_expired(&self, now: Instant) -> bool {
        !self.duration.is_zero() && now.saturating_duration_since(self.start) >= self.duration
    }
}

/// Flood state of a single identity.
#[derive(Debug, Clone, Default)]
pub struct IdentityStatus {
    last_seen: Option<Instant>,
    limited: bool,
    limited_at: Option<Instant>,
    count: usize,
    custom: Option<CustomIgnore>,
}

impl IdentityStatus {
    /// A status that has never counted an event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of the current counting window, `None` if never populated.
    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    /// Whether the identity is limited.
    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// When the current punishment clock started.
    pub fn limited_at(&self) -> Option<Instant> {
        self.limited_at
    }

    /// Events counted in the current window.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The installed override, expired or not.
    pub fn custom(&self) -> Option<&CustomIgnore> {
        self.custom.as_ref()
    }

    /// Install or replace the custom override, returning the previous one.
    pub fn set_custom(&mut self, custom: CustomIgnore) -> Option<CustomIgnore> {
        self.custom.replace(custom)
    }

    /// Remove the custom override, returning it.
    pub fn take_custom(&mut self) -> Option<CustomIgnore> {
        self.custom.take()
    }

    /// Clear the override if it has run out, returning the expired record.
    pub fn expire_custom(&mut self, now: Instant) -> Option<CustomIgnore> {
        match self.custom {
            Some(custom) if custom.is_expired(now) => self.custom.take(),
            _ => None,
        }
    }

    /// Whether an override is active at `now`. Expired overrides are cleared.
    pub fn is_custom_limited(&mut self, now: Instant) -> bool {
        self.expire_custom(now);
        self.custom.is_some()
    }

    /// Count one event and decide.
    ///
    /// Never returns [`Decision::PassThrough`].
    pub fn register(&mut self, now: Instant, policy: &FloodPolicy) -> Decision {
        if self.limited {
            let served = self
                .limited_at
                .map_or(Duration::MAX, |at| now.saturating_duration_since(at));

            if served > policy.punishment {
                self.limited = false;
                self.limited_at = None;
                self.start_window(now);
                return Decision::Admitted;
            }

            if policy.strict {
                self.limited_at = Some(now);
            }
            return Decision::AlreadyLimited;
        }

        let window_over = self
            .last_seen
            .map_or(true, |seen| now.saturating_duration_since(seen) > policy.window);

        if window_over {
            self.start_window(now);
            return Decision::Admitted;
        }

        self.count += 1;
        if self.count > policy.max_count {
            self.limited = true;
            self.limited_at = Some(now);
            return Decision::NewlyLimited;
        }

        Decision::Admitted
    }

    /// Whether the reaper may drop this status.
    ///
    /// Limited identities and identities with an override are always kept.
    /// Call [`expire_custom`](Self::expire_custom) first so stale overrides
    /// do not pin the entry.
    pub fn can_be_deleted(&self, now: Instant, window: Duration) -> bool {
        if self.custom.is_some() {
            return false;
        }

        match self.last_seen {
            None => true,
            Some(seen) => now.saturating_duration_since(seen) > window && !self.limited,
        }
    }

    fn start_window(&mut self, now: Instant) {
        self.count = 1;
        self.last_seen = Some(now);
    }
}
