//! Shared application state for the pulse service.
//!
//! Holds the frozen build identity and the single metrics registry. Both are
//! created once at startup and cloned into handlers and middleware by `Arc`.

use std::sync::Arc;

use pulse_core::BuildIdentity;

use crate::obs::{Exposition, MetricsRegistry};

/// Fixed service name reported by `/version` and `pulse_build_info`.
pub const SERVICE_NAME: &str = "pulse";

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    identity: BuildIdentity,
    metrics: Arc<MetricsRegistry>,
    exposition: Arc<dyn Exposition>,
}

impl AppState {
    /// Build state with a fresh registry that also serves `/metrics`.
    pub fn new(identity: BuildIdentity) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let exposition: Arc<dyn Exposition> = metrics.clone();
        Self::with_exposition(identity, metrics, exposition)
    }

    /// Build state whose `/metrics` output comes from `exposition` instead of
    /// the recording registry.
    pub fn with_exposition(
        identity: BuildIdentity,
        metrics: Arc<MetricsRegistry>,
        exposition: Arc<dyn Exposition>,
    ) -> Self {
        metrics.register_build_info(&identity, SERVICE_NAME);
        Self {
            inner: Arc::new(AppStateInner {
                identity,
                metrics,
                exposition,
            }),
        }
    }

    pub fn identity(&self) -> &BuildIdentity {
        &self.inner.identity
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn exposition(&self) -> Arc<dyn Exposition> {
        Arc::clone(&self.inner.exposition)
    }
}
