//! Status and metadata shared by the reflected custom resources.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation marking an object as mirrored from the database
pub const DATABASE_MANAGED_ANNOTATION: &str = "gameservers.dev/database-managed";

/// Annotation carrying the RFC 3339 time of the last successful sync
pub const LAST_SYNCED_AT_ANNOTATION: &str = "gameservers.dev/last-synced-at";

/// Placeholder written wherever a secret would otherwise be reflected
pub const REDACTED: &str = "<redacted>";

/// Phase reported on a reflected instance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum InstancePhase {
    /// Not yet confirmed by the reflector.
    #[default]
    Pending,
    /// Present in the database and mirrored into the cluster.
    Running,
}

impl std::fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstancePhase::Pending => write!(f, "Pending"),
            InstancePhase::Running => write!(f, "Running"),
        }
    }
}

/// Status block of a reflected instance.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    /// Current phase.
    #[serde(default)]
    pub phase: InstancePhase,
    /// Database id of the mirrored entity.
    pub internal_id: String,
}

impl InstanceStatus {
    /// Status stamped on every reflected object.
    pub fn running(internal_id: &str) -> Self {
        Self {
            phase: InstancePhase::Running,
            internal_id: internal_id.to_string(),
        }
    }
}

/// One reflected environment entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}
