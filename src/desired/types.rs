//! Desired-state records loaded from the database.
//!
//! These are the normalized rows the reconciliation engine works from. The
//! `id` of each record is immutable and is the only join key between the
//! database row and the cluster objects derived from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::controller::error::Error;
use crate::resources::units::ExposureMode;

/// Single environment variable entry. Keys are unique within one spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Workload flavor of a compute instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeKind {
    /// Persistent-volume-backed workload (StatefulSet)
    Stateful,
    /// Ephemeral workload (Deployment)
    Stateless,
}

impl fmt::Display for ComputeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeKind::Stateful => write!(f, "STATEFUL"),
            ComputeKind::Stateless => write!(f, "STATELESS"),
        }
    }
}

impl FromStr for ComputeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STATEFUL" => Ok(ComputeKind::Stateful),
            "STATELESS" => Ok(ComputeKind::Stateless),
            other => Err(Error::Validation(format!("unknown compute kind: {other}"))),
        }
    }
}

/// Proxy software flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyKind {
    Velocity,
    Bungeecord,
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Velocity => write!(f, "VELOCITY"),
            ProxyKind::Bungeecord => write!(f, "BUNGEECORD"),
        }
    }
}

impl FromStr for ProxyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VELOCITY" => Ok(ProxyKind::Velocity),
            "BUNGEECORD" => Ok(ProxyKind::Bungeecord),
            other => Err(Error::Validation(format!("unknown proxy kind: {other}"))),
        }
    }
}

/// Desired configuration of one game server instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSpec {
    pub id: String,
    pub kind: ComputeKind,
    pub listen_port: i32,
    /// Raw memory budget as stored, e.g. `"2G"` or `"512M"`
    pub memory_budget: String,
    pub description: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub exposure: ExposureMode,
    /// Ordered environment entries with unique keys
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
}

/// Desired configuration of one proxy instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    pub id: String,
    pub kind: ProxyKind,
    pub external_address: String,
    pub external_port: i32,
    pub listen_port: i32,
    pub memory_budget: String,
    pub access_token: String,
    #[serde(default)]
    pub exposure: ExposureMode,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
}

/// The two entity kinds the engine manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Compute,
    Proxy,
}

impl EntityKind {
    /// Label value used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Compute => "compute",
            EntityKind::Proxy => "proxy",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
