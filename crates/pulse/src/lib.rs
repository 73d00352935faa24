//! Top-level facade crate for pulse.
//!
//! Re-exports the core types and the service library so users can depend on a single crate.

pub mod core {
    pub use pulse_core::*;
}

pub mod service {
    pub use pulse_service::*;
}
