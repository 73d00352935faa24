//! pulse service library entry.
//!
//! Wires build identity, the metrics registry, request instrumentation, and
//! the ops/API routes into one axum `Router`. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod router;
