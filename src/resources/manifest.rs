//! Manifest sets.
//!
//! A [`Manifest`] is one fully rendered cluster object. [`build_manifests`]
//! renders the three objects an instance owns, in apply order.

use std::fmt;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service};

use crate::resources::common::{InstanceTemplate, WorkloadFlavor};
use crate::resources::configmap::generate_configmap;
use crate::resources::services::generate_service;
use crate::resources::workload::{generate_deployment, generate_statefulset};

/// Kinds of objects the engine writes to the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    ConfigMap,
    Service,
    Deployment,
    StatefulSet,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::ConfigMap => "ConfigMap",
            ObjectKind::Service => "Service",
            ObjectKind::Deployment => "Deployment",
            ObjectKind::StatefulSet => "StatefulSet",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WorkloadFlavor> for ObjectKind {
    fn from(flavor: WorkloadFlavor) -> Self {
        match flavor {
            WorkloadFlavor::Deployment => ObjectKind::Deployment,
            WorkloadFlavor::StatefulSet => ObjectKind::StatefulSet,
        }
    }
}

/// Kind and name of one managed object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A rendered cluster object.
#[derive(Clone, Debug, PartialEq)]
pub enum Manifest {
    ConfigMap(ConfigMap),
    Service(Service),
    Deployment(Deployment),
    StatefulSet(StatefulSet),
}

impl Manifest {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Manifest::ConfigMap(_) => ObjectKind::ConfigMap,
            Manifest::Service(_) => ObjectKind::Service,
            Manifest::Deployment(_) => ObjectKind::Deployment,
            Manifest::StatefulSet(_) => ObjectKind::StatefulSet,
        }
    }

    fn meta(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
        match self {
            Manifest::ConfigMap(o) => &o.metadata,
            Manifest::Service(o) => &o.metadata,
            Manifest::Deployment(o) => &o.metadata,
            Manifest::StatefulSet(o) => &o.metadata,
        }
    }

    fn meta_mut(&mut self) -> &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
        match self {
            Manifest::ConfigMap(o) => &mut o.metadata,
            Manifest::Service(o) => &mut o.metadata,
            Manifest::Deployment(o) => &mut o.metadata,
            Manifest::StatefulSet(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    /// Carry the server's version token into a replace request.
    pub fn set_resource_version(&mut self, version: Option<String>) {
        self.meta_mut().resource_version = version;
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind(), self.name())
    }
}

/// Render the config, exposure and workload objects, in apply order.
pub fn build_manifests(template: &InstanceTemplate) -> Vec<Manifest> {
    let workload = match template.flavor {
        WorkloadFlavor::Deployment => Manifest::Deployment(generate_deployment(template)),
        WorkloadFlavor::StatefulSet => Manifest::StatefulSet(generate_statefulset(template)),
    };
    vec![
        Manifest::ConfigMap(generate_configmap(template)),
        Manifest::Service(generate_service(template)),
        workload,
    ]
}

/// The objects an instance owns, in the same order as [`build_manifests`].
pub fn owned_objects(template: &InstanceTemplate) -> Vec<ObjectRef> {
    vec![
        ObjectRef::new(ObjectKind::ConfigMap, template.name.clone()),
        ObjectRef::new(ObjectKind::Service, template.name.clone()),
        ObjectRef::new(template.flavor.into(), template.name.clone()),
    ]
}

/// Objects owned under `previous` that `current` no longer owns.
pub fn superseded_objects(
    previous: &InstanceTemplate,
    current: &InstanceTemplate,
) -> Vec<ObjectRef> {
    let keep = owned_objects(current);
    owned_objects(previous)
        .into_iter()
        .filter(|object| !keep.contains(object))
        .collect()
}
