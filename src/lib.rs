//! # flood-throttle
//!
//! Per-identity flood control for chat bots.
//!
//! Every incoming event is resolved to an identity (a user or a whole chat)
//! and counted inside a sliding window. An identity that sends more than
//! `max_count` events in one window becomes **limited** and its events are
//! suppressed until the punishment has been served. A background reaper
//! evicts identities that have gone quiet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flood_throttle::{Decision, Limiter, Update};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter: Limiter<Update> = Limiter::builder()
//!     .with_window(Duration::from_secs(10))
//!     .with_punishment(Duration::from_secs(30))
//!     .with_max_count(3)
//!     .with_trigger(|update: &Update| println!("limiting {:?}", update.sender))
//!     .build()?;
//!
//! // Evaluation only happens while running
//! limiter.start()?;
//!
//! let update = Update::message(-100123, 42).with_text("hello");
//! match limiter.admit(&update) {
//!     Decision::PassThrough | Decision::Admitted => { /* handle the update */ }
//!     Decision::AlreadyLimited | Decision::NewlyLimited => { /* drop it */ }
//! }
//!
//! limiter.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Decisions
//!
//! - `PassThrough`: the event was not evaluated (limiter not running,
//!   channel or edit not allowed, no text in text-only mode, exempt identity,
//!   custom override, condition or exception predicate)
//! - `Admitted`: counted and within limits
//! - `NewlyLimited`: this event pushed the identity over the limit; triggers
//!   run once
//! - `AlreadyLimited`: the identity is serving its punishment
//!
//! ## Strict Mode
//!
//! With `with_strict(true)` every event sent while limited restarts the
//! punishment, so an identity that keeps sending stays limited.
//!
//! ## Exceptions and Overrides
//!
//! ```rust,no_run
//! # use flood_throttle::{Limiter, Update};
//! # use std::time::Duration;
//! # #[tokio::main]
//! # async fn main() {
//! let limiter: Limiter<Update> = Limiter::new();
//! limiter.add_exception_ids([777]);
//! limiter.start().unwrap();
//!
//! // 777 is exempt, but this override puts it back under evaluation
//! limiter
//!     .add_custom_ignore(777, Duration::from_secs(60), true)
//!     .unwrap();
//!
//! // 42 passes through for the next ten minutes
//! limiter
//!     .add_custom_ignore(42, Duration::from_secs(600), false)
//!     .unwrap();
//! # }
//! ```
//!
//! ## Observability
//!
//! Lifecycle changes and reaper sweeps are logged through `tracing`, and
//! decision counters are available from [`Limiter::metrics`]:
//!
//! ```rust,no_run
//! # use flood_throttle::{Limiter, Update};
//! # let limiter: Limiter<Update> = Limiter::new();
//! let snapshot = limiter.metrics().snapshot();
//! println!("suppression rate: {:.2}%", snapshot.suppression_rate() * 100.0);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

pub mod error;

// Re-export commonly used types for convenience
pub use domain::{
    event::{EventKind, FloodEvent, IdentityId, Update},
    exceptions::ExceptionList,
    policy::FloodPolicy,
    status::{CustomIgnore, Decision, IdentityStatus},
};

pub use application::{
    config::{LimiterBuilder, LimiterConfig},
    hooks::{Filter, Trigger},
    limiter::Limiter,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Storage},
    registry::{IdentityRegistry, SweepOutcome},
};

pub use error::{BuildError, LimiterError};

pub use infrastructure::{clock::SystemClock, storage::ShardedStorage};
