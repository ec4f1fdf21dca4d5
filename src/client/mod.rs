//! Cluster client provider.
//!
//! [`ClusterApi`] is the typed verb set the engine needs from the cluster,
//! scoped to one namespace. Controllers and the reflector receive it as an
//! explicit `Arc<dyn ClusterApi>` dependency so tests can substitute a double.
//!
//! ## Architecture
//!
//! - `ClusterApi`: create/replace/get/delete for owned objects and
//!   list/get/create/replace/delete/patch-status for reflected custom resources
//! - `kube_cluster`: production implementation over `kube::Api`
//!
//! Every error is a [`crate::Error`]; Kubernetes API failures keep their HTTP
//! status code so callers can use `is_conflict()` and `is_not_found()`.

pub mod kube_cluster;

use std::fmt;

use async_trait::async_trait;
use kube::Resource;
use kube::core::{ApiResource, DynamicObject};

#[cfg(test)]
use mockall::automock;

use crate::controller::error::Error;
use crate::crd::{ComputeInstance, InstanceStatus, ProxyInstance};
use crate::resources::manifest::{Manifest, ObjectKind};

pub use kube_cluster::KubeCluster;

/// Field manager name for the operator
pub const FIELD_MANAGER: &str = "gameserver-operator";

/// Kinds of reflected custom resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReflectedKind {
    ComputeInstance,
    ProxyInstance,
}

impl ReflectedKind {
    /// API resource descriptor used for dynamic access
    pub fn api_resource(&self) -> ApiResource {
        match self {
            ReflectedKind::ComputeInstance => ApiResource::erase::<ComputeInstance>(&()),
            ReflectedKind::ProxyInstance => ApiResource::erase::<ProxyInstance>(&()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectedKind::ComputeInstance => "ComputeInstance",
            ReflectedKind::ProxyInstance => "ProxyInstance",
        }
    }

    /// `apiVersion` string of the kind
    pub fn api_version(&self) -> String {
        match self {
            ReflectedKind::ComputeInstance => ComputeInstance::api_version(&()).to_string(),
            ReflectedKind::ProxyInstance => ProxyInstance::api_version(&()).to_string(),
        }
    }
}

impl fmt::Display for ReflectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed verbs against one namespace of the cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create an owned object. Fails with HTTP 409 if it already exists.
    async fn create(&self, manifest: &Manifest) -> Result<(), Error>;

    /// Replace an owned object. The manifest must carry the current resourceVersion.
    async fn replace(&self, manifest: &Manifest) -> Result<(), Error>;

    /// Current resourceVersion of an owned object, `None` if it does not exist.
    async fn resource_version(&self, kind: ObjectKind, name: &str)
    -> Result<Option<String>, Error>;

    /// Delete an owned object. Fails with HTTP 404 if it is already gone.
    async fn delete(&self, kind: ObjectKind, name: &str) -> Result<(), Error>;

    /// List all reflected objects of a kind.
    async fn list_reflected(&self, kind: ReflectedKind) -> Result<Vec<DynamicObject>, Error>;

    /// Fetch one reflected object.
    async fn get_reflected(&self, kind: ReflectedKind, name: &str)
    -> Result<DynamicObject, Error>;

    /// Create a reflected object.
    async fn create_reflected(
        &self,
        kind: ReflectedKind,
        object: &DynamicObject,
    ) -> Result<(), Error>;

    /// Replace a reflected object using its resourceVersion.
    async fn replace_reflected(
        &self,
        kind: ReflectedKind,
        object: &DynamicObject,
    ) -> Result<(), Error>;

    /// Write the status subresource of a reflected object.
    async fn patch_reflected_status(
        &self,
        kind: ReflectedKind,
        name: &str,
        status: &InstanceStatus,
    ) -> Result<(), Error>;

    /// Delete a reflected object.
    async fn delete_reflected(&self, kind: ReflectedKind, name: &str) -> Result<(), Error>;
}
