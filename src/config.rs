//! Process configuration read from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `OPERATOR_NAMESPACE` / `POD_NAMESPACE` | `default` |
//! | `POLL_INTERVAL_SECS` | `10` |
//! | `REFLECTOR_ENABLED` | `true` |
//! | `REFLECTOR_INTERVAL_SECS` | poll interval |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |
//! | `HEALTH_PORT` | `8080` |
//! | `SERVER_IMAGE` / `VELOCITY_IMAGE` / `BUNGEECORD_IMAGE` | built-in images |
//!
//! Values that are present but malformed are rejected at startup.

use std::str::FromStr;
use std::time::Duration;

use crate::controller::error::{Error, Result};
use crate::desired::{
    DEFAULT_BUNGEECORD_IMAGE, DEFAULT_SERVER_IMAGE, DEFAULT_VELOCITY_IMAGE, ManifestSettings,
};

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Operator configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    pub database_url: String,
    pub namespace: String,
    pub poll_interval: Duration,
    pub reflector_enabled: bool,
    pub reflector_interval: Duration,
    pub database_max_connections: u32,
    pub health_port: u16,
    pub server_image: String,
    pub velocity_image: String,
    pub bungeecord_image: String,
}

impl OperatorConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url =
            get("DATABASE_URL").ok_or_else(|| Error::Config("DATABASE_URL is required".into()))?;
        let namespace = get("OPERATOR_NAMESPACE")
            .or_else(|| get("POD_NAMESPACE"))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let poll_secs: u64 = parse_var(&get, "POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_secs == 0 {
            return Err(Error::Config("POLL_INTERVAL_SECS must be at least 1".into()));
        }
        let reflector_secs: u64 = parse_var(&get, "REFLECTOR_INTERVAL_SECS")?.unwrap_or(poll_secs);
        if reflector_secs == 0 {
            return Err(Error::Config("REFLECTOR_INTERVAL_SECS must be at least 1".into()));
        }

        Ok(Self {
            database_url,
            namespace,
            poll_interval: Duration::from_secs(poll_secs),
            reflector_enabled: parse_bool(&get, "REFLECTOR_ENABLED")?.unwrap_or(true),
            reflector_interval: Duration::from_secs(reflector_secs),
            database_max_connections: parse_var(&get, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            health_port: parse_var(&get, "HEALTH_PORT")?.unwrap_or(DEFAULT_HEALTH_PORT),
            server_image: get("SERVER_IMAGE").unwrap_or_else(|| DEFAULT_SERVER_IMAGE.to_string()),
            velocity_image: get("VELOCITY_IMAGE")
                .unwrap_or_else(|| DEFAULT_VELOCITY_IMAGE.to_string()),
            bungeecord_image: get("BUNGEECORD_IMAGE")
                .unwrap_or_else(|| DEFAULT_BUNGEECORD_IMAGE.to_string()),
        })
    }

    /// Manifest settings derived from this configuration
    pub fn manifest_settings(&self) -> ManifestSettings {
        ManifestSettings {
            namespace: self.namespace.clone(),
            server_image: self.server_image.clone(),
            velocity_image: self.velocity_image.clone(),
            bungeecord_image: self.bungeecord_image.clone(),
        }
    }
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} has invalid value {raw:?}")))
        })
        .transpose()
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    get(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(Error::Config(format!("{key} has invalid value {raw:?}"))),
        })
        .transpose()
}
