//! ComputeInstance Custom Resource Definition.
//!
//! Read-only mirror of one game server row, kept for operators and tooling.
//! The database stays the source of truth; editing these objects has no effect
//! and the next reflection cycle overwrites them.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::{EnvEntry, InstanceStatus};

/// ComputeInstance mirrors a database-managed game server.
///
/// Example:
/// ```yaml
/// apiVersion: gameservers.dev/v1alpha1
/// kind: ComputeInstance
/// metadata:
///   name: lobby-1
///   annotations:
///     gameservers.dev/database-managed: "true"
/// spec:
///   kind: STATEFUL
///   listenPort: 25565
///   memoryBudget: 2G
///   accessToken: <redacted>
/// status:
///   phase: Running
///   internalId: lobby-1
/// ```
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gameservers.dev",
    version = "v1alpha1",
    kind = "ComputeInstance",
    plural = "computeinstances",
    shortname = "ci",
    status = "InstanceStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Kind", "type":"string", "jsonPath":".spec.kind"}"#,
    printcolumn = r#"{"name":"Port", "type":"integer", "jsonPath":".spec.listenPort"}"#,
    printcolumn = r#"{"name":"Memory", "type":"string", "jsonPath":".spec.memoryBudget"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstanceSpec {
    /// Workload flavor (STATEFUL or STATELESS).
    pub kind: String,
    pub listen_port: i32,
    pub memory_budget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Always the redaction marker.
    pub access_token: String,
    pub exposure: String,
    #[serde(default)]
    pub env_vars: Vec<EnvEntry>,
}
