//! Domain layer - pure flood-control logic with no runtime dependencies.
//!
//! This layer contains the core concepts and invariants of the flood gate:
//! - Events and identity resolution
//! - The per-identity window/punishment state machine
//! - Flood policies
//! - Exception lists
//!
//! All types in this layer are plain data and easily testable.

pub mod event;
pub mod exceptions;
pub mod policy;
pub mod status;
