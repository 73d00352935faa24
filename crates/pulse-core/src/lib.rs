//! pulse core: error types, environment lookup, and build identity.
//!
//! This crate carries no transport or runtime dependencies; the HTTP surface
//! lives in `pulse-service`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here so startup paths
//! degrade to defaults or `PulseError` instead of aborting the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod env;
pub mod error;
pub mod identity;

/// Shared result type.
pub use error::{ErrorKind, PulseError, Result};
pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use identity::BuildIdentity;
