//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Identity registry (storage of identity statuses)
//! - Limiter (admission decisions and lifecycle)
//! - Reaper (periodic eviction of stale statuses)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod config;
pub mod hooks;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod reaper;
pub mod registry;
