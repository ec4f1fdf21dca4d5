//! Resource generation module.
//!
//! Renders and applies the cluster objects owned by each desired instance.
//!
//! ## Resources Generated
//!
//! | Resource | Purpose |
//! |----------|---------|
//! | ConfigMap | Non-secret metadata and the instance access token |
//! | Service | Network exposure (ClusterIP, NodePort or LoadBalancer) |
//! | Deployment | Workload for stateless servers and proxies |
//! | StatefulSet | Workload with a data volume for stateful servers |

pub mod apply;
pub mod common;
pub mod configmap;
pub mod manifest;
pub mod services;
pub mod units;
pub mod workload;

pub use apply::{ApplyOutcome, ManifestApplier};
pub use common::{InstanceTemplate, WorkloadFlavor, standard_labels};
pub use manifest::{Manifest, ObjectKind, ObjectRef, build_manifests};
pub use units::ExposureMode;
