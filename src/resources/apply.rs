//! Idempotent application of manifest sets.
//!
//! `apply` is create-or-replace: a create that hits HTTP 409 falls back to
//! fetching the live resourceVersion and replacing. `remove` and `retire`
//! are best-effort deletes where HTTP 404 counts as success.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::ClusterApi;
use crate::controller::error::{Error, Result};
use crate::resources::common::InstanceTemplate;
use crate::resources::manifest::{
    Manifest, ObjectRef, build_manifests, owned_objects, superseded_objects,
};

/// Result of applying one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Replaced,
}

/// Writes rendered manifests to the cluster.
#[derive(Clone)]
pub struct ManifestApplier {
    cluster: Arc<dyn ClusterApi>,
}

impl ManifestApplier {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    /// Create the object, or replace it if it already exists.
    pub async fn create_or_replace(&self, mut manifest: Manifest) -> Result<ApplyOutcome> {
        match self.cluster.create(&manifest).await {
            Ok(()) => Ok(ApplyOutcome::Created),
            Err(e) if e.is_conflict() => {
                let version = self
                    .cluster
                    .resource_version(manifest.kind(), manifest.name())
                    .await?;
                match version {
                    Some(version) => {
                        manifest.set_resource_version(Some(version));
                        self.cluster.replace(&manifest).await?;
                        Ok(ApplyOutcome::Replaced)
                    }
                    // Deleted between the conflict and the lookup
                    None => {
                        self.cluster.create(&manifest).await?;
                        Ok(ApplyOutcome::Created)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the config, exposure and workload objects of an instance, in order.
    ///
    /// Stops at the first object that fails; the caller retries the whole set.
    pub async fn apply(&self, template: &InstanceTemplate) -> Result<()> {
        for manifest in build_manifests(template) {
            let object = manifest.object_ref();
            match self.create_or_replace(manifest).await {
                Ok(outcome) => {
                    debug!(
                        entity = %template.entity,
                        id = %template.id,
                        kind = %object.kind,
                        name = %object.name,
                        outcome = ?outcome,
                        "Applied object"
                    );
                }
                Err(e) => {
                    warn!(
                        entity = %template.entity,
                        id = %template.id,
                        kind = %object.kind,
                        name = %object.name,
                        operation = "apply",
                        error = %e,
                        "Failed to apply object"
                    );
                    return Err(e);
                }
            }
        }
        info!(entity = %template.entity, id = %template.id, name = %template.name, "Applied instance");
        Ok(())
    }

    /// Delete every object the instance owns.
    pub async fn remove(&self, template: &InstanceTemplate) -> Result<()> {
        self.delete_all(template, &owned_objects(template)).await?;
        info!(entity = %template.entity, id = %template.id, name = %template.name, "Removed instance");
        Ok(())
    }

    /// Delete objects `previous` owned that `current` no longer does.
    ///
    /// Returns how many objects were retired.
    pub async fn retire(
        &self,
        previous: &InstanceTemplate,
        current: &InstanceTemplate,
    ) -> Result<usize> {
        let objects = superseded_objects(previous, current);
        if objects.is_empty() {
            return Ok(0);
        }
        self.delete_all(previous, &objects).await?;
        info!(
            entity = %current.entity,
            id = %current.id,
            retired = objects.len(),
            "Retired superseded objects"
        );
        Ok(objects.len())
    }

    /// Attempt every delete, then report how many failed.
    async fn delete_all(&self, template: &InstanceTemplate, objects: &[ObjectRef]) -> Result<()> {
        let mut failed = 0;
        for object in objects {
            match self.cluster.delete(object.kind, &object.name).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(kind = %object.kind, name = %object.name, "Already absent");
                }
                Err(e) => {
                    warn!(
                        entity = %template.entity,
                        id = %template.id,
                        kind = %object.kind,
                        name = %object.name,
                        operation = "delete",
                        error = %e,
                        "Failed to delete object"
                    );
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(Error::Cleanup { failed });
        }
        Ok(())
    }
}
