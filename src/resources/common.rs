//! Common resource generation utilities.
//!
//! Provides the normalized [`InstanceTemplate`] every manifest generator works
//! from, plus deterministic naming and the standard labels and annotations
//! applied to all managed objects.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use sha2::{Digest, Sha256};

use crate::desired::{EntityKind, EnvVar};
use crate::resources::units::ExposureMode;

/// Label naming the tool that manages an object
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of the [`MANAGED_BY_LABEL`] label
pub const MANAGED_BY: &str = "gameserver-operator";

/// Label carrying the database id of the owning entity
pub const INSTANCE_ID_LABEL: &str = "gameservers.dev/instance-id";

/// Label carrying the entity kind (`compute` or `proxy`)
pub const ENTITY_LABEL: &str = "gameservers.dev/entity";

/// Prefix of every compute object name
pub const COMPUTE_NAME_PREFIX: &str = "gameserver";

/// Which workload object an instance runs as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadFlavor {
    /// Ephemeral pods
    Deployment,
    /// Pods with a persistent volume per replica
    StatefulSet,
}

/// Everything needed to render the cluster objects of one entity.
///
/// Built from a desired spec by [`crate::desired::DesiredSpec::template`];
/// generators never look at the desired row directly.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceTemplate {
    pub entity: EntityKind,
    pub id: String,
    /// Shared name of the config, exposure and workload objects
    pub name: String,
    pub namespace: String,
    pub flavor: WorkloadFlavor,
    pub image: String,
    /// Port the process listens on inside the pod
    pub listen_port: i32,
    /// Port the network-exposure object publishes
    pub service_port: i32,
    pub memory_budget: String,
    pub exposure: ExposureMode,
    pub external_address: Option<String>,
    pub access_token: String,
    /// Non-secret metadata stored in the config object
    pub metadata: BTreeMap<String, String>,
    /// Built-in container environment (credentials, runtime flags)
    pub builtin_env: Vec<EnvVar>,
    /// Environment from the desired spec; overrides built-ins with the same key
    pub env_vars: Vec<EnvVar>,
}

/// Bytes of the id digest appended to rewritten names
const ID_DIGEST_BYTES: usize = 4;

/// Map an id onto a DNS-1123 name fragment, one fragment per id.
///
/// Ids that are already lowercase pass through unchanged. Any other id is
/// lowercased with `_`, `.` and spaces turned into `-`, and a short SHA-256
/// digest of the raw id is appended, so `lobby_1`, `Lobby-1` and `lobby-1`
/// never share objects.
pub fn dns_safe(id: &str) -> String {
    let cleaned = id.trim().to_ascii_lowercase().replace(['_', '.', ' '], "-");
    if cleaned == id {
        return cleaned;
    }
    let digest = Sha256::digest(id.as_bytes());
    let short: Vec<u8> = digest.iter().take(ID_DIGEST_BYTES).copied().collect();
    format!("{cleaned}-{}", hex::encode(short))
}

/// Object name for a compute instance: `gameserver-<id>`
pub fn compute_object_name(id: &str) -> String {
    format!("{}-{}", COMPUTE_NAME_PREFIX, dns_safe(id))
}

/// Object name for a proxy instance: `<kind-lowercased>-<id>`
pub fn proxy_object_name(kind: &str, id: &str) -> String {
    format!("{}-{}", kind.to_ascii_lowercase(), dns_safe(id))
}

/// Standard labels applied to all managed objects
pub fn standard_labels(template: &InstanceTemplate) -> BTreeMap<String, String> {
    let mut labels = pod_selector_labels(template);
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        template.entity.as_str().to_string(),
    );
    labels.insert(ENTITY_LABEL.to_string(), template.entity.as_str().to_string());
    labels
}

/// Labels used to select the pods of one instance
pub fn pod_selector_labels(template: &InstanceTemplate) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), template.name.clone());
    labels.insert(INSTANCE_ID_LABEL.to_string(), dns_safe(&template.id));
    labels
}

/// Object metadata shared by the generated objects
pub fn object_meta(template: &InstanceTemplate) -> ObjectMeta {
    ObjectMeta {
        name: Some(template.name.clone()),
        namespace: Some(template.namespace.clone()),
        labels: Some(standard_labels(template)),
        ..Default::default()
    }
}

/// Merge built-in and user environment, user entries winning on key collisions.
///
/// Built-ins keep their position; user entries follow in their stored order.
pub fn merged_env(template: &InstanceTemplate) -> Vec<EnvVar> {
    let mut env: Vec<EnvVar> = template
        .builtin_env
        .iter()
        .filter(|builtin| !template.env_vars.iter().any(|user| user.key == builtin.key))
        .cloned()
        .collect();
    env.extend(template.env_vars.iter().cloned());
    env
}
