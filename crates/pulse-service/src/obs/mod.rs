//! Observability: the request metrics registry and log subscriber setup.
//!
//! Metrics are stored as atomics and rendered by the `/metrics` handler.
//! Logs go through `tracing`; the subscriber is installed once by the binary.

pub mod logging;
pub mod metrics;

pub use logging::LogFormat;
pub use metrics::{Exposition, MetricsRegistry, PROMETHEUS_CONTENT_TYPE};
