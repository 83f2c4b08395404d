//! Flood limiter coordination logic.
//!
//! The limiter owns the lifecycle of one identity registry and its reaper,
//! the configuration, the exception lists and the caller hooks. `admit` runs
//! the pass-through checks in a fixed order and hands the remaining events to
//! the identity state machine.

use crate::application::config::{LimiterBuilder, LimiterConfig};
use crate::application::hooks::{Filter, HookList, Trigger};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::reaper::{Reaper, ReaperHandle};
use crate::application::registry::IdentityRegistry;
use crate::domain::{
    event::{FloodEvent, IdentityId},
    exceptions::ExceptionList,
    status::{Decision, IdentityStatus},
};
use crate::error::LimiterError;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

enum Lifecycle<S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    Idle,
    Running(Running<S>),
    Stopped,
}

struct Running<S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    registry: Arc<IdentityRegistry<S>>,
    reaper: ReaperHandle,
}

/// Per-identity flood gate.
///
/// Events are only evaluated while the limiter is running; an idle or
/// stopped limiter lets everything through.
///
/// # Example
/// ```
/// use flood_throttle::{Decision, Limiter, Update};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter: Limiter<Update> = Limiter::builder().with_max_count(2).build().unwrap();
/// limiter.start().unwrap();
///
/// let event = Update::message(-100, 42).with_text("hi");
/// assert_eq!(limiter.admit(&event), Decision::Admitted);
/// assert_eq!(limiter.admit(&event), Decision::Admitted);
/// assert_eq!(limiter.admit(&event), Decision::NewlyLimited);
/// assert!(limiter.is_limited(42));
///
/// limiter.shutdown().await.unwrap();
/// # }
/// ```
pub struct Limiter<E, S = ShardedStorage<IdentityId, IdentityStatus>>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    lifecycle: RwLock<Lifecycle<S>>,
    config: Arc<RwLock<LimiterConfig>>,
    exceptions: RwLock<ExceptionList>,
    conditions: HookList<Filter<E>>,
    exception_filters: HookList<Filter<E>>,
    triggers: HookList<Trigger<E>>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl<E> Limiter<E> {
    /// Create a builder for configuring the limiter.
    pub fn builder() -> LimiterBuilder<E> {
        LimiterBuilder::new()
    }

    /// Create an idle limiter with default settings.
    pub fn new() -> Self {
        Self::from_parts(
            LimiterConfig::default(),
            Vec::new(),
            Arc::new(SystemClock::new()),
            LimiterBuilder::new(),
        )
    }
}

impl<E> Default for Limiter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> Limiter<E, S>
where
    S: Storage<IdentityId, IdentityStatus> + Default + 'static,
{
    pub(crate) fn from_parts(
        config: LimiterConfig,
        exception_ids: Vec<IdentityId>,
        clock: Arc<dyn Clock>,
        builder: LimiterBuilder<E>,
    ) -> Self {
        let mut exceptions = ExceptionList::new();
        exceptions.add(exception_ids);

        let conditions = HookList::new();
        conditions.replace(builder.conditions);
        let exception_filters = HookList::new();
        exception_filters.replace(builder.exceptions);
        let triggers = HookList::new();
        triggers.replace(builder.triggers);

        Self {
            lifecycle: RwLock::new(Lifecycle::Idle),
            config: Arc::new(RwLock::new(config)),
            exceptions: RwLock::new(exceptions),
            conditions,
            exception_filters,
            triggers,
            clock,
            metrics: Metrics::new(),
        }
    }

    /// Allocate a fresh registry and spawn its reaper on the current tokio
    /// runtime. Does nothing if already running.
    ///
    /// # Errors
    /// Returns `LimiterError::NoRuntime` when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), LimiterError> {
        let mut lifecycle = self.lifecycle.write();
        if matches!(*lifecycle, Lifecycle::Running(_)) {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| LimiterError::NoRuntime)?;
        let registry = Arc::new(IdentityRegistry::new(S::default(), Arc::clone(&self.clock)));
        let reaper = Reaper::new(
            &registry,
            Arc::clone(&self.config),
            self.metrics.clone(),
        )
        .spawn(&runtime);

        *lifecycle = Lifecycle::Running(Running { registry, reaper });

        let config = *self.config.read();
        info!(
            window_ms = config.window.as_millis() as u64,
            punishment_ms = config.punishment.as_millis() as u64,
            max_count = config.max_count,
            strict = config.strict,
            "flood limiter started"
        );
        Ok(())
    }
}

impl<E, S> Limiter<E, S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    /// Stop evaluating events and release the registry.
    ///
    /// The reaper is signalled but not awaited; use
    /// [`shutdown`](Self::shutdown) to wait for it. Configuration, exception
    /// IDs and hooks are kept for a later `start`.
    pub fn stop(&self) {
        if let Some(reaper) = self.teardown() {
            reaper.cancel();
        }
    }

    /// Stop the limiter and wait for its reaper to exit.
    ///
    /// # Errors
    /// Returns `LimiterError::ReaperJoin` if the reaper task panicked.
    pub async fn shutdown(&self) -> Result<(), LimiterError> {
        match self.teardown() {
            Some(reaper) => reaper.shutdown().await,
            None => Ok(()),
        }
    }

    fn teardown(&self) -> Option<ReaperHandle> {
        let mut lifecycle = self.lifecycle.write();
        let Lifecycle::Running(running) = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        else {
            return None;
        };

        let identities = running.registry.len();
        running.registry.clear();
        info!(identities, "flood limiter stopped");

        Some(running.reaper)
    }

    /// Whether the limiter is running.
    pub fn is_enabled(&self) -> bool {
        matches!(*self.lifecycle.read(), Lifecycle::Running(_))
    }

    /// Whether the limiter has been stopped.
    pub fn is_stopped(&self) -> bool {
        matches!(*self.lifecycle.read(), Lifecycle::Stopped)
    }

    fn with_registry<R>(&self, f: impl FnOnce(&IdentityRegistry<S>) -> R) -> Option<R> {
        match &*self.lifecycle.read() {
            Lifecycle::Running(running) => Some(f(&running.registry)),
            Lifecycle::Idle | Lifecycle::Stopped => None,
        }
    }

    /// Decide what to do with one event.
    ///
    /// On [`Decision::NewlyLimited`] every trigger is invoked with the event,
    /// in registration order and without any lock held. A panicking trigger
    /// propagates to the caller.
    pub fn admit(&self, event: &E) -> Decision
    where
        E: FloodEvent,
    {
        let decision = self.evaluate(event);
        self.metrics.record(decision);

        if decision == Decision::NewlyLimited {
            let triggers = self.triggers.snapshot();
            for trigger in triggers.iter() {
                trigger(event);
            }
        }

        decision
    }

    fn evaluate(&self, event: &E) -> Decision
    where
        E: FloodEvent,
    {
        if !self.is_enabled() {
            return Decision::PassThrough;
        }

        let config = *self.config.read();
        let kind = event.kind();
        if kind.is_channel() && !config.allow_channels {
            return Decision::PassThrough;
        }
        if kind.is_edit() && !config.allow_edits {
            return Decision::PassThrough;
        }
        if config.text_only && !event.has_text() {
            return Decision::PassThrough;
        }

        let Some(id) = event.identity(config.consider_user) else {
            return Decision::PassThrough;
        };

        // Overrides that have run out are cleared by these lookups, so an
        // exemption is back in force from the override's end instant
        let screened = self.with_registry(|registry| {
            let exempt = self
                .exceptions
                .read()
                .exempts(event, |other| registry.ignores_exceptions(other));
            !exempt
                && !registry
                    .active_custom(id)
                    .is_some_and(|custom| !custom.ignore_exceptions)
        });
        if screened != Some(true) {
            return Decision::PassThrough;
        }

        let conditions = self.conditions.snapshot();
        if !conditions.iter().all(|condition| condition(event)) {
            return Decision::PassThrough;
        }
        let exception_filters = self.exception_filters.snapshot();
        if exception_filters.iter().any(|exception| exception(event)) {
            return Decision::PassThrough;
        }

        let policy = config.policy();
        let Some(decision) = self.with_registry(|registry| registry.register(id, &policy)) else {
            return Decision::PassThrough;
        };

        if decision == Decision::NewlyLimited {
            debug!(identity = id, count = policy.max_count.saturating_add(1), "identity limited");
        }
        decision
    }

    /// Set the counting window.
    pub fn set_window(&self, window: Duration) {
        self.config.write().window = window;
    }

    /// Get the counting window.
    pub fn window(&self) -> Duration {
        self.config.read().window
    }

    /// Set the punishment duration.
    pub fn set_punishment(&self, punishment: Duration) {
        self.config.write().punishment = punishment;
    }

    /// Get the punishment duration.
    pub fn punishment(&self) -> Duration {
        self.config.read().punishment
    }

    /// Set how many messages are allowed per window.
    pub fn set_max_count(&self, max_count: usize) {
        self.config.write().max_count = max_count;
    }

    /// Get how many messages are allowed per window.
    pub fn max_count(&self) -> usize {
        self.config.read().max_count
    }

    /// Set the reaper interval.
    ///
    /// Values not longer than `window + punishment` are replaced by
    /// `window + punishment + 1 minute`. Takes effect after the reaper's
    /// current sleep.
    pub fn set_max_cache_duration(&self, d: Duration) {
        let mut config = self.config.write();
        if config.set_max_cache_duration(d) {
            warn!(
                requested_ms = d.as_millis() as u64,
                applied_secs = config.max_cache_duration.as_secs(),
                "reaper interval clamped"
            );
        }
    }

    /// Reset the reaper interval to `window + punishment + 1 minute`.
    pub fn set_default_interval(&self) {
        let mut config = self.config.write();
        config.max_cache_duration = config.default_interval();
    }

    /// Get the reaper interval.
    pub fn max_cache_duration(&self) -> Duration {
        self.config.read().max_cache_duration
    }

    /// Restart the punishment on every event sent while limited.
    pub fn set_strict(&self, strict: bool) {
        self.config.write().strict = strict;
    }

    /// Whether strict mode is on.
    pub fn is_strict(&self) -> bool {
        self.config.read().strict
    }

    /// Only evaluate events that carry text.
    pub fn set_text_only(&self, text_only: bool) {
        self.config.write().text_only = text_only;
    }

    /// Whether events without text pass through.
    pub fn is_text_only(&self) -> bool {
        self.config.read().text_only
    }

    /// Evaluate channel posts (`true`) or let them through (`false`).
    pub fn set_allow_channels(&self, allow: bool) {
        self.config.write().allow_channels = allow;
    }

    /// Whether channel posts are evaluated.
    pub fn is_allowing_channels(&self) -> bool {
        self.config.read().allow_channels
    }

    /// Evaluate edited messages (`true`) or let them through (`false`).
    pub fn set_allow_edits(&self, allow: bool) {
        self.config.write().allow_edits = allow;
    }

    /// Whether edited messages are evaluated.
    pub fn is_allowing_edits(&self) -> bool {
        self.config.read().allow_edits
    }

    /// Track senders (`true`) or whole chats (`false`).
    pub fn set_consider_user(&self, consider_user: bool) {
        self.config.write().consider_user = consider_user;
    }

    /// Whether senders are tracked instead of chats.
    pub fn is_considering_user(&self) -> bool {
        self.config.read().consider_user
    }

    /// Snapshot of the scalar configuration.
    pub fn config(&self) -> LimiterConfig {
        *self.config.read()
    }

    /// Add identities that are never evaluated. Duplicates are ignored.
    pub fn add_exception_ids(&self, ids: impl IntoIterator<Item = IdentityId>) {
        self.exceptions.write().add(ids);
    }

    /// Remove every exception ID.
    pub fn clear_exception_ids(&self) {
        self.exceptions.write().clear();
    }

    /// Replace the exception IDs.
    pub fn set_exception_ids(&self, ids: impl IntoIterator<Item = IdentityId>) {
        self.exceptions.write().set(ids);
    }

    /// Whether `id` is in the exception list.
    pub fn is_in_exception_list(&self, id: IdentityId) -> bool {
        self.exceptions.read().contains(id)
    }

    /// Whether `id` has its exemption suspended by an active custom ignore
    /// installed with `ignore_exceptions`. Always `false` when not running.
    pub fn is_ignored_exception(&self, id: IdentityId) -> bool {
        self.with_registry(|registry| registry.ignores_exceptions(id))
            .unwrap_or(false)
    }

    /// Add a condition every evaluated event must satisfy.
    pub fn add_condition(&self, condition: impl Fn(&E) -> bool + Send + Sync + 'static) {
        self.conditions.push(Arc::new(condition));
    }

    /// Append several conditions, keeping their order.
    pub fn add_conditions(&self, conditions: impl IntoIterator<Item = Filter<E>>) {
        self.conditions.extend(conditions);
    }

    /// Replace every condition.
    pub fn set_conditions(&self, conditions: Vec<Filter<E>>) {
        self.conditions.replace(conditions);
    }

    /// Remove every condition.
    pub fn clear_conditions(&self) {
        self.conditions.clear();
    }

    /// Number of registered conditions.
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Add an exception predicate; matching events are not evaluated.
    pub fn add_exception(&self, exception: impl Fn(&E) -> bool + Send + Sync + 'static) {
        self.exception_filters.push(Arc::new(exception));
    }

    /// Remove every exception predicate. Exception IDs are kept.
    pub fn clear_exceptions(&self) {
        self.exception_filters.clear();
    }

    /// Number of registered exception predicates.
    pub fn exception_count(&self) -> usize {
        self.exception_filters.len()
    }

    /// Replace every trigger.
    pub fn set_triggers(&self, triggers: Vec<Trigger<E>>) {
        self.triggers.replace(triggers);
    }

    /// Replace every trigger with a single one.
    pub fn set_trigger(&self, trigger: impl Fn(&E) + Send + Sync + 'static) {
        self.triggers.replace(vec![Arc::new(trigger)]);
    }

    /// Add a trigger after the existing ones.
    pub fn append_trigger(&self, trigger: impl Fn(&E) + Send + Sync + 'static) {
        self.triggers.push(Arc::new(trigger));
    }

    /// Add several triggers after the existing ones.
    pub fn append_triggers(&self, triggers: impl IntoIterator<Item = Trigger<E>>) {
        self.triggers.extend(triggers);
    }

    /// Remove every trigger.
    pub fn clear_triggers(&self) {
        self.triggers.clear();
    }

    /// Number of registered triggers.
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Install or replace a custom override on `id`.
    ///
    /// A zero `duration` never expires. With `ignore_exceptions = false` the
    /// identity passes through while the override is active. With
    /// `ignore_exceptions = true` the identity stays under flood evaluation
    /// even if it is in the exception list.
    ///
    /// # Errors
    /// Returns `LimiterError::NotRunning` if the limiter is not running.
    pub fn add_custom_ignore(
        &self,
        id: IdentityId,
        duration: Duration,
        ignore_exceptions: bool,
    ) -> Result<(), LimiterError> {
        self.with_registry(|registry| registry.set_custom(id, duration, ignore_exceptions))
            .ok_or(LimiterError::NotRunning)?;
        Ok(())
    }

    /// Remove the custom override on `id`.
    ///
    /// Returns `true` if an override was removed.
    pub fn remove_custom_ignore(&self, id: IdentityId) -> bool {
        self.with_registry(|registry| registry.take_custom(id))
            .flatten()
            .is_some()
    }

    /// Clone the status of `id`, if tracked.
    pub fn status(&self, id: IdentityId) -> Option<IdentityStatus> {
        self.with_registry(|registry| registry.get(id)).flatten()
    }

    /// Whether `id` is currently limited.
    pub fn is_limited(&self, id: IdentityId) -> bool {
        self.status(id).is_some_and(|status| status.is_limited())
    }

    /// Number of tracked identities. Zero when not running.
    pub fn identity_count(&self) -> usize {
        self.with_registry(|registry| registry.len()).unwrap_or(0)
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl<E, S> Drop for Limiter<E, S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    fn drop(&mut self) {
        if let Lifecycle::Running(running) = &*self.lifecycle.get_mut() {
            running.reaper.cancel();
        }
    }
}

impl<E, S> std::fmt::Debug for Limiter<E, S>
where
    S: Storage<IdentityId, IdentityStatus>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("running", &self.is_enabled())
            .field("config", &*self.config.read())
            .field("exceptions", &*self.exceptions.read())
            .field("conditions", &self.conditions)
            .field("exception_filters", &self.exception_filters)
            .field("triggers", &self.triggers)
            .field("metrics", &self.metrics)
            .finish()
    }
}
