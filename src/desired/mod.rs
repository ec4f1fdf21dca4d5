//! Desired state.
//!
//! Normalized records loaded from the database, plus the [`DesiredSpec`]
//! abstraction that lets one controller implementation drive both entity
//! kinds.

pub mod store;
mod types;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::controller::drift::{compute_changed, proxy_changed};
use crate::controller::error::Result;
use crate::resources::common::{
    InstanceTemplate, WorkloadFlavor, compute_object_name, proxy_object_name,
};
use crate::resources::units::heap_setting;

pub use store::{DesiredStateStore, PgDesiredStateStore};
pub use types::*;

/// Default container image for game servers
pub const DEFAULT_SERVER_IMAGE: &str = "itzg/minecraft-server:latest";
/// Default container image for Velocity proxies
pub const DEFAULT_VELOCITY_IMAGE: &str = "itzg/mc-proxy:latest";
/// Default container image for BungeeCord proxies
pub const DEFAULT_BUNGEECORD_IMAGE: &str = "itzg/mc-proxy:latest";

/// Deployment-wide settings that shape every rendered manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestSettings {
    pub namespace: String,
    pub server_image: String,
    pub velocity_image: String,
    pub bungeecord_image: String,
}

impl ManifestSettings {
    /// Settings with the default images.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            server_image: DEFAULT_SERVER_IMAGE.to_string(),
            velocity_image: DEFAULT_VELOCITY_IMAGE.to_string(),
            bungeecord_image: DEFAULT_BUNGEECORD_IMAGE.to_string(),
        }
    }
}

/// A desired-state record the engine can reconcile.
#[async_trait]
pub trait DesiredSpec: Clone + std::fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Entity kind, used in logs and metric labels.
    const ENTITY: EntityKind;

    /// Immutable database id.
    fn id(&self) -> &str;

    /// Normalize into the template the manifest generators work from.
    fn template(&self, settings: &ManifestSettings) -> InstanceTemplate;

    /// Whether `newer` differs from `self` in a way that needs a re-apply.
    fn changed(&self, newer: &Self) -> bool;

    /// Load every record of this kind.
    async fn load_all(store: &dyn DesiredStateStore) -> Result<Vec<Self>>;
}

#[async_trait]
impl DesiredSpec for ComputeSpec {
    const ENTITY: EntityKind = EntityKind::Compute;

    fn id(&self) -> &str {
        &self.id
    }

    fn template(&self, settings: &ManifestSettings) -> InstanceTemplate {
        let flavor = match self.kind {
            ComputeKind::Stateful => WorkloadFlavor::StatefulSet,
            ComputeKind::Stateless => WorkloadFlavor::Deployment,
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("SERVER_ID".to_string(), self.id.clone());
        metadata.insert("KIND".to_string(), self.kind.to_string());
        if let Some(description) = &self.description {
            metadata.insert("DESCRIPTION".to_string(), description.clone());
        }

        InstanceTemplate {
            entity: Self::ENTITY,
            id: self.id.clone(),
            name: compute_object_name(&self.id),
            namespace: settings.namespace.clone(),
            flavor,
            image: settings.server_image.clone(),
            listen_port: self.listen_port,
            service_port: self.listen_port,
            memory_budget: self.memory_budget.clone(),
            exposure: self.exposure,
            external_address: None,
            access_token: self.access_token.clone(),
            metadata,
            builtin_env: vec![
                EnvVar::new("SERVER_ID", self.id.clone()),
                EnvVar::new("EULA", "TRUE"),
                EnvVar::new("SERVER_PORT", self.listen_port.to_string()),
                EnvVar::new("MEMORY", heap_setting(&self.memory_budget)),
            ],
            env_vars: self.env_vars.clone(),
        }
    }

    fn changed(&self, newer: &Self) -> bool {
        compute_changed(self, newer)
    }

    async fn load_all(store: &dyn DesiredStateStore) -> Result<Vec<Self>> {
        store.list_compute().await
    }
}

#[async_trait]
impl DesiredSpec for ProxySpec {
    const ENTITY: EntityKind = EntityKind::Proxy;

    fn id(&self) -> &str {
        &self.id
    }

    fn template(&self, settings: &ManifestSettings) -> InstanceTemplate {
        let image = match self.kind {
            ProxyKind::Velocity => settings.velocity_image.clone(),
            ProxyKind::Bungeecord => settings.bungeecord_image.clone(),
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("PROXY_ID".to_string(), self.id.clone());
        metadata.insert("KIND".to_string(), self.kind.to_string());
        metadata.insert("EXTERNAL_ADDRESS".to_string(), self.external_address.clone());
        metadata.insert("EXTERNAL_PORT".to_string(), self.external_port.to_string());

        InstanceTemplate {
            entity: Self::ENTITY,
            id: self.id.clone(),
            name: proxy_object_name(&self.kind.to_string(), &self.id),
            namespace: settings.namespace.clone(),
            flavor: WorkloadFlavor::Deployment,
            image,
            listen_port: self.listen_port,
            service_port: self.external_port,
            memory_budget: self.memory_budget.clone(),
            exposure: self.exposure,
            external_address: Some(self.external_address.clone()),
            access_token: self.access_token.clone(),
            metadata,
            builtin_env: vec![
                EnvVar::new("PROXY_ID", self.id.clone()),
                EnvVar::new("TYPE", self.kind.to_string()),
                EnvVar::new("SERVER_PORT", self.listen_port.to_string()),
                EnvVar::new("MEMORY", heap_setting(&self.memory_budget)),
            ],
            env_vars: self.env_vars.clone(),
        }
    }

    fn changed(&self, newer: &Self) -> bool {
        proxy_changed(self, newer)
    }

    async fn load_all(store: &dyn DesiredStateStore) -> Result<Vec<Self>> {
        store.list_proxies().await
    }
}
