//! Central registry of per-identity flood state.
//!
//! The registry maps identity keys to their [`IdentityStatus`]. Entries are
//! created lazily on first contact and removed by the reaper once stale.

use crate::application::ports::{Clock, Storage};
use crate::domain::{
    event::IdentityId,
    policy::FloodPolicy,
    status::{CustomIgnore, Decision, IdentityStatus},
};
use std::sync::Arc;
use std::time::Duration;

/// Result of one registry sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Number of statuses removed
    pub evicted: usize,
    /// Number of overrides that had run out and were cleared
    pub expired_overrides: usize,
}

/// Registry managing all identity statuses.
///
/// Generic over the storage implementation; in production this is a
/// `ShardedStorage`.
#[derive(Debug)]
pub struct IdentityRegistry<S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> IdentityRegistry<S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    /// Create a new registry with storage and a clock.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Count one event for `id` under `policy`, creating the status if absent.
    pub fn register(&self, id: IdentityId, policy: &FloodPolicy) -> Decision {
        let now = self.clock.now();
        self.storage
            .with_entry_mut(id, IdentityStatus::new, |status| status.register(now, policy))
    }

    /// Look up the active override for `id`, clearing it if it has run out.
    pub fn active_custom(&self, id: IdentityId) -> Option<CustomIgnore> {
        let now = self.clock.now();
        self.storage
            .with_existing_mut(&id, |status| {
                status.expire_custom(now);
                status.custom().copied()
            })
            .flatten()
    }

    /// Whether `id` has an active override that suspends its exemption.
    ///
    /// The check and the expiry of a run-out override happen under the same
    /// entry lock as [`set_custom`](Self::set_custom), so a freshly installed
    /// override is never lost to a concurrent expiry.
    pub fn ignores_exceptions(&self, id: IdentityId) -> bool {
        self.active_custom(id)
            .is_some_and(|custom| custom.ignore_exceptions)
    }

    /// Install or replace an override starting now, returning the one it
    /// replaced.
    pub fn set_custom(
        &self,
        id: IdentityId,
        duration: Duration,
        ignore_exceptions: bool,
    ) -> Option<CustomIgnore> {
        let custom = CustomIgnore::new(self.clock.now(), duration, ignore_exceptions);
        self.storage
            .with_entry_mut(id, IdentityStatus::new, |status| status.set_custom(custom))
    }

    /// Remove the override of `id`, returning it.
    pub fn take_custom(&self, id: IdentityId) -> Option<CustomIgnore> {
        self.storage
            .with_existing_mut(&id, |status| status.take_custom())
            .flatten()
    }

    /// Clone the status of `id`.
    pub fn get(&self, id: IdentityId) -> Option<IdentityStatus> {
        self.storage.with_existing(&id, |status| status.clone())
    }

    /// Get the number of tracked identities.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Clear all tracked state.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Drop every status that can be deleted at the current time.
    pub fn sweep(&self, window: Duration) -> SweepOutcome {
        let now = self.clock.now();
        let mut outcome = SweepOutcome::default();

        self.storage.retain(|_id, status| {
            if status.expire_custom(now).is_some() {
                outcome.expired_overrides += 1;
            }

            let keep = !status.can_be_deleted(now, window);
            if !keep {
                outcome.evicted += 1;
            }
            keep
        });

        outcome
    }
}
