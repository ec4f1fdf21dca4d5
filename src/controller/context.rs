//! Shared context for the sync loops.
//!
//! Holds the explicit dependencies every loop is constructed with: the
//! cluster client, the desired-state store, the manifest settings and the
//! optional health state used for metrics.

use std::sync::Arc;

use crate::client::ClusterApi;
use crate::desired::{DesiredStateStore, ManifestSettings};
use crate::health::HealthState;

/// Shared context for controllers and the reflector
#[derive(Clone)]
pub struct Context {
    /// Namespaced cluster client
    pub cluster: Arc<dyn ClusterApi>,
    /// Desired-state source
    pub store: Arc<dyn DesiredStateStore>,
    /// Namespace and images used when rendering manifests
    pub settings: ManifestSettings,
    /// Optional health state for metrics and readiness
    pub health_state: Option<Arc<HealthState>>,
}

impl Context {
    /// Create a new context
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        store: Arc<dyn DesiredStateStore>,
        settings: ManifestSettings,
        health_state: Option<Arc<HealthState>>,
    ) -> Self {
        Self {
            cluster,
            store,
            settings,
            health_state,
        }
    }

    /// Namespace all managed objects live in
    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }
}
