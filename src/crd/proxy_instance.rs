//! ProxyInstance Custom Resource Definition.
//!
//! Read-only mirror of one proxy row; see [`super::ComputeInstance`] for the
//! ownership rules.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::{EnvEntry, InstanceStatus};

/// ProxyInstance mirrors a database-managed proxy.
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gameservers.dev",
    version = "v1alpha1",
    kind = "ProxyInstance",
    plural = "proxyinstances",
    shortname = "pi",
    status = "InstanceStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Kind", "type":"string", "jsonPath":".spec.kind"}"#,
    printcolumn = r#"{"name":"Address", "type":"string", "jsonPath":".spec.externalAddress"}"#,
    printcolumn = r#"{"name":"Port", "type":"integer", "jsonPath":".spec.externalPort"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInstanceSpec {
    /// Proxy software (VELOCITY or BUNGEECORD).
    pub kind: String,
    pub external_address: String,
    pub external_port: i32,
    pub listen_port: i32,
    pub memory_budget: String,
    /// Always the redaction marker.
    pub access_token: String,
    pub exposure: String,
    #[serde(default)]
    pub env_vars: Vec<EnvEntry>,
}
