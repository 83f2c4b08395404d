//! Observability metrics for the flood gate.
//!
//! Provides counters about admission decisions and reaping for monitoring
//! and debugging.

use crate::domain::status::Decision;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking flood-control statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Events that bypassed evaluation
    events_passed: AtomicU64,
    /// Events counted and admitted
    events_admitted: AtomicU64,
    /// Events suppressed because the identity was limited
    events_suppressed: AtomicU64,
    /// Transitions into the limited state
    identities_limited: AtomicU64,
    /// Statuses removed by the reaper
    identities_evicted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record the outcome of one admission decision.
    pub(crate) fn record(&self, decision: Decision) {
        match decision {
            Decision::PassThrough => {
                self.inner.events_passed.fetch_add(1, Ordering::Relaxed);
            }
            Decision::Admitted => {
                self.inner.events_admitted.fetch_add(1, Ordering::Relaxed);
            }
            Decision::AlreadyLimited => {
                self.inner.events_suppressed.fetch_add(1, Ordering::Relaxed);
            }
            Decision::NewlyLimited => {
                self.inner.events_suppressed.fetch_add(1, Ordering::Relaxed);
                self.inner.identities_limited.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record evicted statuses.
    pub(crate) fn record_evictions(&self, count: usize) {
        self.inner
            .identities_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the number of events that bypassed evaluation.
    pub fn events_passed(&self) -> u64 {
        self.inner.events_passed.load(Ordering::Relaxed)
    }

    /// Get the number of admitted events.
    pub fn events_admitted(&self) -> u64 {
        self.inner.events_admitted.load(Ordering::Relaxed)
    }

    /// Get the number of suppressed events.
    pub fn events_suppressed(&self) -> u64 {
        self.inner.events_suppressed.load(Ordering::Relaxed)
    }

    /// Get the number of times an identity became limited.
    pub fn identities_limited(&self) -> u64 {
        self.inner.identities_limited.load(Ordering::Relaxed)
    }

    /// Get the number of statuses evicted by the reaper.
    pub fn identities_evicted(&self) -> u64 {
        self.inner.identities_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_passed: self.events_passed(),
            events_admitted: self.events_admitted(),
            events_suppressed: self.events_suppressed(),
            identities_limited: self.identities_limited(),
            identities_evicted: self.identities_evicted(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.events_passed.store(0, Ordering::Relaxed);
        self.inner.events_admitted.store(0, Ordering::Relaxed);
        self.inner.events_suppressed.store(0, Ordering::Relaxed);
        self.inner.identities_limited.store(0, Ordering::Relaxed);
        self.inner.identities_evicted.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_passed: u64,
    pub events_admitted: u64,
    pub events_suppressed: u64,
    pub identities_limited: u64,
    pub identities_evicted: u64,
}

impl MetricsSnapshot {
    /// Total number of events seen, evaluated or not.
    pub fn total_events(&self) -> u64 {
        self.events_passed
            .saturating_add(self.events_admitted)
            .saturating_add(self.events_suppressed)
    }

    /// Ratio of suppressed events to evaluated events (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been evaluated.
    pub fn suppression_rate(&self) -> f64 {
        let evaluated = self.events_admitted.saturating_add(self.events_suppressed);
        if evaluated == 0 {
            0.0
        } else {
            self.events_suppressed as f64 / evaluated as f64
        }
    }
}
