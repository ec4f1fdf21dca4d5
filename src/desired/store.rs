//! Read access to the desired-state tables.
//!
//! The engine never writes to the database. Rows are loaded in full on every
//! cycle and normalized into [`ComputeSpec`] / [`ProxySpec`] records, each
//! carrying its ordered environment list.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

#[cfg(test)]
use mockall::automock;

use crate::controller::error::{Error, Result};
use crate::desired::{ComputeSpec, EnvVar, ProxySpec};
use crate::resources::units::ExposureMode;

/// Source of desired state for both entity kinds.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// All compute specs, each with its ordered env list.
    async fn list_compute(&self) -> Result<Vec<ComputeSpec>>;

    /// All proxy specs, each with its ordered env list.
    async fn list_proxies(&self) -> Result<Vec<ProxySpec>>;
}

#[derive(sqlx::FromRow, Debug, Clone)]
struct ComputeRow {
    id: String,
    kind: String,
    listen_port: i32,
    memory_budget: String,
    description: Option<String>,
    access_token: String,
    exposure: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
struct ProxyRow {
    id: String,
    kind: String,
    external_address: String,
    external_port: i32,
    listen_port: i32,
    memory_budget: String,
    access_token: String,
    exposure: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
struct EnvRow {
    instance_id: String,
    key: String,
    value: String,
}

/// Group env rows by owning instance, keeping the query's order.
fn group_env(rows: Vec<EnvRow>) -> HashMap<String, Vec<EnvVar>> {
    let mut grouped: HashMap<String, Vec<EnvVar>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.instance_id)
            .or_default()
            .push(EnvVar::new(row.key, row.value));
    }
    grouped
}

fn exposure_of(raw: Option<&str>) -> ExposureMode {
    raw.map(ExposureMode::parse).unwrap_or_default()
}

impl ComputeRow {
    fn into_spec(self, env_vars: Vec<EnvVar>) -> Result<ComputeSpec> {
        let kind = self.kind.parse().map_err(|e: Error| {
            Error::Validation(format!("compute instance {}: {e}", self.id))
        })?;
        Ok(ComputeSpec {
            exposure: exposure_of(self.exposure.as_deref()),
            id: self.id,
            kind,
            listen_port: self.listen_port,
            memory_budget: self.memory_budget,
            description: self.description,
            access_token: self.access_token,
            env_vars,
        })
    }
}

impl ProxyRow {
    fn into_spec(self, env_vars: Vec<EnvVar>) -> Result<ProxySpec> {
        let kind = self.kind.parse().map_err(|e: Error| {
            Error::Validation(format!("proxy instance {}: {e}", self.id))
        })?;
        Ok(ProxySpec {
            exposure: exposure_of(self.exposure.as_deref()),
            id: self.id,
            kind,
            external_address: self.external_address,
            external_port: self.external_port,
            listen_port: self.listen_port,
            memory_budget: self.memory_budget,
            access_token: self.access_token,
            env_vars,
        })
    }
}

/// Postgres-backed [`DesiredStateStore`].
#[derive(Clone)]
pub struct PgDesiredStateStore {
    pool: PgPool,
}

impl PgDesiredStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;
        info!(max_connections, "Connected to desired-state database");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl DesiredStateStore for PgDesiredStateStore {
    async fn list_compute(&self) -> Result<Vec<ComputeSpec>> {
        let rows = sqlx::query_as::<_, ComputeRow>(
            "SELECT id, kind, listen_port, memory_budget, description, access_token, exposure \
             FROM compute_instances ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        let env = sqlx::query_as::<_, EnvRow>(
            "SELECT instance_id, key, value FROM compute_env_vars \
             ORDER BY instance_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut env = group_env(env);
        rows.into_iter()
            .map(|row| {
                let vars = env.remove(&row.id).unwrap_or_default();
                row.into_spec(vars)
            })
            .collect()
    }

    async fn list_proxies(&self) -> Result<Vec<ProxySpec>> {
        let rows = sqlx::query_as::<_, ProxyRow>(
            "SELECT id, kind, external_address, external_port, listen_port, memory_budget, \
             access_token, exposure FROM proxy_instances ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        let env = sqlx::query_as::<_, EnvRow>(
            "SELECT instance_id, key, value FROM proxy_env_vars \
             ORDER BY instance_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut env = group_env(env);
        rows.into_iter()
            .map(|row| {
                let vars = env.remove(&row.id).unwrap_or_default();
                row.into_spec(vars)
            })
            .collect()
    }
}
