//! Cluster-state reflector.
//!
//! Mirrors desired-state rows into `ComputeInstance` / `ProxyInstance`
//! custom resources so operators can inspect them with cluster tooling. It
//! runs on its own timer, independent of the entity controllers.
//!
//! Per kind, each cycle:
//! 1. Lists reflected objects and indexes them by `status.internalId`.
//! 2. Loads the desired specs.
//! 3. Creates or replaces one object per spec. The live object is refetched
//!    right before every replace so the write carries the latest
//!    resourceVersion. Access tokens are written as a redaction marker.
//! 4. Deletes objects whose `internalId` no longer matches any spec, and
//!    labelled objects that never got an `internalId` and no spec claims.
//!
//! Failures are isolated per object; one bad object never stops the rest.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::core::DynamicObject;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::client::ReflectedKind;
use crate::controller::common::{PeriodicLoop, PeriodicTask};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::crd::{
    ComputeInstanceSpec, DATABASE_MANAGED_ANNOTATION, EnvEntry, InstanceStatus,
    LAST_SYNCED_AT_ANNOTATION, ProxyInstanceSpec, REDACTED,
};
use crate::desired::{ComputeSpec, DesiredSpec, EnvVar, ProxySpec};
use crate::resources::common::{MANAGED_BY, MANAGED_BY_LABEL, dns_safe};

/// A desired spec that has a reflected custom resource.
pub trait Reflectable: DesiredSpec {
    const REFLECTED: ReflectedKind;

    /// The `spec` block of the reflected object, with secrets redacted.
    fn reflected_spec(&self) -> Result<Value>;
}

fn env_entries(env_vars: &[EnvVar]) -> Vec<EnvEntry> {
    env_vars
        .iter()
        .map(|e| EnvEntry {
            key: e.key.clone(),
            value: e.value.clone(),
        })
        .collect()
}

impl Reflectable for ComputeSpec {
    const REFLECTED: ReflectedKind = ReflectedKind::ComputeInstance;

    fn reflected_spec(&self) -> Result<Value> {
        let spec = ComputeInstanceSpec {
            kind: self.kind.to_string(),
            listen_port: self.listen_port,
            memory_budget: self.memory_budget.clone(),
            description: self.description.clone(),
            access_token: REDACTED.to_string(),
            exposure: self.exposure.to_string(),
            env_vars: env_entries(&self.env_vars),
        };
        Ok(serde_json::to_value(spec)?)
    }
}

impl Reflectable for ProxySpec {
    const REFLECTED: ReflectedKind = ReflectedKind::ProxyInstance;

    fn reflected_spec(&self) -> Result<Value> {
        let spec = ProxyInstanceSpec {
            kind: self.kind.to_string(),
            external_address: self.external_address.clone(),
            external_port: self.external_port,
            listen_port: self.listen_port,
            memory_budget: self.memory_budget.clone(),
            access_token: REDACTED.to_string(),
            exposure: self.exposure.to_string(),
            env_vars: env_entries(&self.env_vars),
        };
        Ok(serde_json::to_value(spec)?)
    }
}

/// What one reflection cycle did for one kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReflectionReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Objects whose create, update or delete failed
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Write {
    Created,
    Updated,
}

/// Read `status.internalId` from a reflected object.
pub fn internal_id(object: &DynamicObject) -> Option<&str> {
    object
        .data
        .get("status")
        .and_then(|status| status.get("internalId"))
        .and_then(Value::as_str)
}

/// Whether an object carries this operator's `managed-by` label.
fn is_managed(object: &DynamicObject) -> bool {
    object
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(MANAGED_BY_LABEL))
        .is_some_and(|value| value == MANAGED_BY)
}

/// Default object name for an entity id.
pub fn reflected_name(id: &str) -> String {
    dns_safe(id)
}

/// Mirrors desired state into custom resources.
pub struct ClusterStateReflector {
    ctx: Arc<Context>,
}

impl ClusterStateReflector {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Reflect every spec of one kind.
    ///
    /// Fails only when the listing calls fail; per-object failures are
    /// counted in the report.
    pub async fn reflect_once<S: Reflectable>(&self) -> Result<ReflectionReport> {
        let kind = S::REFLECTED;
        let cluster = &self.ctx.cluster;

        // internalId -> object name
        let mut existing: HashMap<String, String> = HashMap::new();
        // Our objects whose status was never stamped
        let mut unstamped: Vec<String> = Vec::new();
        for object in cluster.list_reflected(kind).await? {
            let Some(name) = object.metadata.name.clone() else {
                continue;
            };
            match internal_id(&object) {
                Some(id) => {
                    existing.insert(id.to_string(), name);
                }
                None if is_managed(&object) => unstamped.push(name),
                None => {}
            }
        }

        let specs = S::load_all(self.ctx.store.as_ref()).await?;
        let mut report = ReflectionReport::default();

        let mut claimed: HashSet<String> = HashSet::new();
        for spec in &specs {
            let known = existing.get(spec.id());
            let name = known
                .cloned()
                .unwrap_or_else(|| reflected_name(spec.id()));
            claimed.insert(name.clone());
            match self.reflect_spec(spec, &name, known.is_some()).await {
                Ok(Write::Created) => report.created += 1,
                Ok(Write::Updated) => report.updated += 1,
                Err(e) => {
                    warn!(
                        entity = %S::ENTITY,
                        id = %spec.id(),
                        kind = %kind,
                        name = %name,
                        operation = "reflect",
                        error = %e,
                        "Failed to reflect object"
                    );
                    report.failed += 1;
                }
            }
        }

        let current: HashSet<&str> = specs.iter().map(|spec| spec.id()).collect();
        let mut orphans: Vec<(Option<&str>, &str)> = existing
            .iter()
            .filter(|(id, _)| !current.contains(id.as_str()))
            .map(|(id, name)| (Some(id.as_str()), name.as_str()))
            .collect();
        orphans.sort();
        unstamped.sort();
        orphans.extend(
            unstamped
                .iter()
                .filter(|name| !claimed.contains(name.as_str()))
                .map(|name| (None, name.as_str())),
        );

        for (id, name) in orphans {
            match cluster.delete_reflected(kind, name).await {
                Ok(()) => {
                    info!(kind = %kind, id = ?id, name = %name, "Deleted orphaned object");
                    report.deleted += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!(kind = %kind, name = %name, "Orphan already absent");
                }
                Err(e) => {
                    warn!(
                        entity = %S::ENTITY,
                        id = ?id,
                        kind = %kind,
                        name = %name,
                        operation = "delete",
                        error = %e,
                        "Failed to delete orphaned object"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Create or replace one reflected object, then stamp its status.
    async fn reflect_spec<S: Reflectable>(&self, spec: &S, name: &str, known: bool) -> Result<Write> {
        let kind = S::REFLECTED;
        let cluster = &self.ctx.cluster;
        let mut object = self.desired_object::<S>(spec, name)?;

        let write = if known {
            self.replace_latest(kind, &mut object).await?
        } else {
            match cluster.create_reflected(kind, &object).await {
                Ok(()) => Write::Created,
                // Exists without a usable internalId; adopt it
                Err(e) if e.is_conflict() => self.replace_latest(kind, &mut object).await?,
                Err(e) => return Err(e),
            }
        };

        cluster
            .patch_reflected_status(kind, name, &InstanceStatus::running(spec.id()))
            .await?;
        Ok(write)
    }

    /// Refetch the live object and replace it with its current resourceVersion.
    ///
    /// Creates the object instead if it vanished since the listing.
    async fn replace_latest(&self, kind: ReflectedKind, object: &mut DynamicObject) -> Result<Write> {
        let cluster = &self.ctx.cluster;
        let name = object.metadata.name.clone().unwrap_or_default();
        match cluster.get_reflected(kind, &name).await {
            Ok(live) => {
                object.metadata.resource_version = live.metadata.resource_version;
                cluster.replace_reflected(kind, object).await?;
                Ok(Write::Updated)
            }
            Err(e) if e.is_not_found() => {
                object.metadata.resource_version = None;
                cluster.create_reflected(kind, object).await?;
                Ok(Write::Created)
            }
            Err(e) => Err(e),
        }
    }

    fn desired_object<S: Reflectable>(&self, spec: &S, name: &str) -> Result<DynamicObject> {
        let resource = S::REFLECTED.api_resource();
        let mut object = DynamicObject::new(name, &resource).within(self.ctx.namespace());

        object.metadata.annotations = Some(BTreeMap::from([
            (DATABASE_MANAGED_ANNOTATION.to_string(), "true".to_string()),
            (
                LAST_SYNCED_AT_ANNOTATION.to_string(),
                jiff::Timestamp::now().to_string(),
            ),
        ]));
        object.metadata.labels = Some(BTreeMap::from([(
            MANAGED_BY_LABEL.to_string(),
            MANAGED_BY.to_string(),
        )]));
        object.data = json!({ "spec": spec.reflected_spec()? });
        Ok(object)
    }

    /// Reflect one kind and record the outcome. Never fails.
    async fn run_kind<S: Reflectable>(&self) -> Option<ReflectionReport> {
        let entity = S::ENTITY;
        let health = self.ctx.health_state.as_ref();
        match self.reflect_once::<S>().await {
            Ok(report) => {
                debug!(
                    entity = %entity,
                    created = report.created,
                    updated = report.updated,
                    deleted = report.deleted,
                    failed = report.failed,
                    "Reflection cycle complete"
                );
                if let Some(health) = health {
                    health.metrics.record_reflection(
                        entity,
                        (report.created + report.updated) as i64,
                        report.failed as u64,
                    );
                }
                Some(report)
            }
            Err(e) => {
                error!(entity = %entity, error = %e, "Reflection cycle aborted");
                if let Some(health) = health {
                    health.metrics.record_reflection_failure(entity);
                }
                None
            }
        }
    }

    /// Reflect both kinds. A failure listing one kind does not skip the other.
    pub async fn run_cycle(&self) -> (Option<ReflectionReport>, Option<ReflectionReport>) {
        let compute = self.run_kind::<ComputeSpec>().await;
        let proxies = self.run_kind::<ProxySpec>().await;
        (compute, proxies)
    }
}

#[async_trait]
impl PeriodicTask for ClusterStateReflector {
    fn name(&self) -> String {
        "reflector".to_string()
    }

    async fn tick(&mut self) {
        self.run_cycle().await;
    }
}

/// A started or stopped reflector.
pub type ReflectorLoop = PeriodicLoop<ClusterStateReflector>;

pub fn reflector_loop(ctx: Arc<Context>, interval: Duration) -> ReflectorLoop {
    PeriodicLoop::new(ClusterStateReflector::new(ctx), interval)
}
