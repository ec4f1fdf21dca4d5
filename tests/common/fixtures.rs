//! Test fixtures and builder patterns for desired-state records.

use gameserver_operator::desired::{ComputeKind, ComputeSpec, EnvVar, ProxyKind, ProxySpec};
use gameserver_operator::resources::ExposureMode;

/// Builder for creating ComputeSpec test fixtures.
///
/// # Example
/// ```ignore
/// let spec = ComputeSpecBuilder::new("lobby-1")
///     .stateful()
///     .memory("2G")
///     .env("MOTD", "hello")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct ComputeSpecBuilder {
    spec: ComputeSpec,
}

impl ComputeSpecBuilder {
    /// Create a stateless server with a 1G budget on the default port.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            spec: ComputeSpec {
                id: id.into(),
                kind: ComputeKind::Stateless,
                listen_port: 25565,
                memory_budget: "1G".to_string(),
                description: None,
                access_token: "token".to_string(),
                exposure: ExposureMode::InternalOnly,
                env_vars: Vec::new(),
            },
        }
    }

    pub fn stateful(mut self) -> Self {
        self.spec.kind = ComputeKind::Stateful;
        self
    }

    pub fn port(mut self, port: i32) -> Self {
        self.spec.listen_port = port;
        self
    }

    pub fn memory(mut self, budget: impl Into<String>) -> Self {
        self.spec.memory_budget = budget.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.spec.access_token = token.into();
        self
    }

    pub fn exposure(mut self, exposure: ExposureMode) -> Self {
        self.spec.exposure = exposure;
        self
    }

    /// Append an environment entry.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.env_vars.push(EnvVar::new(key, value));
        self
    }

    pub fn build(self) -> ComputeSpec {
        self.spec
    }
}

/// Builder for creating ProxySpec test fixtures.
#[derive(Clone, Debug)]
pub struct ProxySpecBuilder {
    spec: ProxySpec,
}

impl ProxySpecBuilder {
    /// Create a Velocity proxy listening on 25577 and published on 25565.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            spec: ProxySpec {
                id: id.into(),
                kind: ProxyKind::Velocity,
                external_address: "play.example.com".to_string(),
                external_port: 25565,
                listen_port: 25577,
                memory_budget: "512M".to_string(),
                access_token: "token".to_string(),
                exposure: ExposureMode::LoadBalanced,
                env_vars: Vec::new(),
            },
        }
    }

    pub fn bungeecord(mut self) -> Self {
        self.spec.kind = ProxyKind::Bungeecord;
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.spec.external_address = address.into();
        self
    }

    pub fn external_port(mut self, port: i32) -> Self {
        self.spec.external_port = port;
        self
    }

    pub fn memory(mut self, budget: impl Into<String>) -> Self {
        self.spec.memory_budget = budget.into();
        self
    }

    pub fn exposure(mut self, exposure: ExposureMode) -> Self {
        self.spec.exposure = exposure;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.env_vars.push(EnvVar::new(key, value));
        self
    }

    pub fn build(self) -> ProxySpec {
        self.spec
    }
}

/// The stateful 2G node-exposed lobby used throughout the scenarios.
pub fn lobby_2g() -> ComputeSpec {
    ComputeSpecBuilder::new("lobby-1")
        .stateful()
        .memory("2G")
        .exposure(ExposureMode::NodeExposed)
        .description("Main lobby")
        .env("MOTD", "hello")
        .build()
}
