//! Background eviction of stale identity statuses.
//!
//! One reaper task runs per started limiter. It wakes up every
//! `max_cache_duration`, sweeps the registry, and exits as soon as it is
//! cancelled or the registry it was given has been released.

use crate::application::config::{LimiterConfig, MIN_REAPER_INTERVAL};
use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::registry::{IdentityRegistry, SweepOutcome};
use crate::domain::{event::IdentityId, status::IdentityStatus};
use crate::error::LimiterError;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Sweeps a registry on a fixed cadence.
pub struct Reaper<S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    registry: Weak<IdentityRegistry<S>>,
    config: Arc<RwLock<LimiterConfig>>,
    metrics: Metrics,
}

impl<S> Reaper<S>
where
    S: Storage<IdentityId, IdentityStatus> + 'static,
{
    /// Create a reaper for `registry`.
    ///
    /// Only a weak reference is kept: dropping the last strong reference
    /// ends the reaper at its next wake-up.
    pub fn new(
        registry: &Arc<IdentityRegistry<S>>,
        config: Arc<RwLock<LimiterConfig>>,
        metrics: Metrics,
    ) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            config,
            metrics,
        }
    }

    /// The interval to sleep before the next sweep.
    ///
    /// Intervals under one second are replaced by the default and written
    /// back to the configuration.
    pub fn interval(&self) -> Duration {
        let current = self.config.read().max_cache_duration;
        if current >= MIN_REAPER_INTERVAL {
            return current;
        }

        let mut config = self.config.write();
        let fallback = config.default_interval();
        warn!(
            configured_ms = current.as_millis() as u64,
            fallback_secs = fallback.as_secs(),
            "reaper interval too short, using default"
        );
        config.max_cache_duration = fallback;
        fallback
    }

    /// Run one sweep now.
    ///
    /// Returns `None` if the registry has been released.
    pub fn sweep_once(&self) -> Option<SweepOutcome> {
        let registry = self.registry.upgrade()?;
        let window = self.config.read().window;
        let outcome = registry.sweep(window);

        self.metrics.record_evictions(outcome.evicted);
        debug!(
            evicted = outcome.evicted,
            expired_overrides = outcome.expired_overrides,
            remaining = registry.len(),
            "reaper sweep finished"
        );
        Some(outcome)
    }

    /// Spawn the sweep loop on `runtime`.
    pub fn spawn(self, runtime: &Handle) -> ReaperHandle {
        let cancel = CancellationToken::new();
        let join = runtime.spawn(self.run(cancel.clone()));
        ReaperHandle { cancel, join }
    }

    async fn run(self, cancel: CancellationToken) {
        loop {
            let interval = self.interval();

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            if self.sweep_once().is_none() {
                break;
            }
        }
        debug!("reaper exited");
    }
}

/// Handle to a running reaper task.
#[derive(Debug)]
pub struct ReaperHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the task and wait for it to exit.
    ///
    /// # Errors
    /// Returns `LimiterError::ReaperJoin` if the task panicked.
    pub async fn shutdown(self) -> Result<(), LimiterError> {
        self.cancel.cancel();
        self.join.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::FloodPolicy;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::ShardedStorage;
    use std::time::Instant;

    type TestRegistry = IdentityRegistry<ShardedStorage<IdentityId, IdentityStatus>>;

    type TestReaper = Reaper<ShardedStorage<IdentityId, IdentityStatus>>;

    fn setup(clock: &MockClock) -> (Arc<TestRegistry>, TestReaper) {
        let registry = Arc::new(IdentityRegistry::new(
            ShardedStorage::new(),
            Arc::new(clock.clone()),
        ));
        let config = LimiterConfig {
            window: Duration::from_secs(10),
            punishment: Duration::from_secs(30),
            max_count: 3,
            ..LimiterConfig::default()
        };
        let reaper = Reaper::new(
            &registry,
            Arc::new(RwLock::new(config)),
            Metrics::new(),
        );
        (registry, reaper)
    }

    fn policy() -> FloodPolicy {
        FloodPolicy::new(Duration::from_secs(10), Duration::from_secs(30), 3)
    }

    #[test]
    fn test_sweep_once_records_evictions() {
        let clock = MockClock::new(Instant::now());
        let (registry, reaper) = setup(&clock);

        for id in 0..5 {
            registry.register(id, &policy());
        }
        clock.advance(Duration::from_secs(11));

        let outcome = reaper.sweep_once().unwrap();
        assert_eq!(outcome.evicted, 5);
        assert!(registry.is_empty());
        assert_eq!(reaper.metrics.identities_evicted(), 5);
    }

    #[test]
    fn test_sweep_clears_expired_overrides() {
        let clock = MockClock::new(Instant::now());
        let (registry, reaper) = setup(&clock);

        registry.set_custom(9, Duration::from_secs(1), true);
        registry.set_custom(10, Duration::from_secs(60), true);
        clock.advance(Duration::from_secs(2));

        let outcome = reaper.sweep_once().unwrap();
        assert_eq!(outcome.expired_overrides, 1);
        assert!(registry.get(9).is_none());
        assert!(registry.ignores_exceptions(10));
    }

    #[test]
    fn test_sweep_after_registry_dropped() {
        let clock = MockClock::new(Instant::now());
        let (registry, reaper) = setup(&clock);

        drop(registry);
        assert!(reaper.sweep_once().is_none());
    }

    #[test]
    fn test_interval_corrected_when_too_short() {
        let clock = MockClock::new(Instant::now());
        let (_registry, reaper) = setup(&clock);

        reaper.config.write().max_cache_duration = Duration::from_millis(10);
        assert_eq!(reaper.interval(), Duration::from_secs(100));
        assert_eq!(
            reaper.config.read().max_cache_duration,
            Duration::from_secs(100)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_sweeps_on_interval() {
        let clock = MockClock::new(Instant::now());
        let (registry, reaper) = setup(&clock);
        reaper.config.write().max_cache_duration = Duration::from_secs(50);

        registry.register(1, &policy());
        clock.advance(Duration::from_secs(11));

        let handle = reaper.spawn(&Handle::current());

        tokio::time::sleep(Duration::from_secs(49)).await;
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(registry.is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_exits_when_registry_released() {
        let clock = MockClock::new(Instant::now());
        let (registry, reaper) = setup(&clock);
        reaper.config.write().max_cache_duration = Duration::from_secs(50);

        let handle = reaper.spawn(&Handle::current());
        drop(registry);

        tokio::time::sleep(Duration::from_secs(51)).await;
        assert!(handle.is_finished());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_loop() {
        let clock = MockClock::new(Instant::now());
        let (_registry, reaper) = setup(&clock);

        let handle = reaper.spawn(&Handle::current());
        assert!(!handle.is_finished());
        handle.shutdown().await.unwrap();
    }
}
