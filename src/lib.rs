//! gameserver-operator library crate
//!
//! Reconciles game server and proxy instances stored in a relational
//! database into Kubernetes objects, and mirrors the same rows into
//! `ComputeInstance` / `ProxyInstance` custom resources for visibility.

pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod desired;
pub mod health;
pub mod resources;

pub use config::OperatorConfig;
pub use controller::error::{Error, Result};
pub use health::HealthState;

use std::sync::Arc;

use tracing::info;

use controller::context::Context;
use controller::{EntityController, ReflectorLoop, entity_controller, reflector_loop};
use desired::{ComputeSpec, ProxySpec};

/// The operator's sync loops, started and stopped together.
pub struct Operator {
    compute: EntityController<ComputeSpec>,
    proxies: EntityController<ProxySpec>,
    reflector: Option<ReflectorLoop>,
}

impl Operator {
    /// Build the loops from explicit dependencies. Nothing runs until [`start`](Self::start).
    pub fn new(ctx: Arc<Context>, config: &OperatorConfig) -> Self {
        let reflector = config
            .reflector_enabled
            .then(|| reflector_loop(ctx.clone(), config.reflector_interval));
        Self {
            compute: entity_controller(ctx.clone(), config.poll_interval),
            proxies: entity_controller(ctx, config.poll_interval),
            reflector,
        }
    }

    pub fn start(&mut self) {
        self.compute.start();
        self.proxies.start();
        match self.reflector.as_mut() {
            Some(reflector) => reflector.start(),
            None => info!("Cluster-state reflector disabled"),
        }
    }

    /// Stop every loop, letting in-flight cycles finish.
    pub async fn stop(&mut self) {
        let reflector = self.reflector.as_mut();
        tokio::join!(self.compute.stop(), self.proxies.stop(), async move {
            if let Some(reflector) = reflector {
                reflector.stop().await;
            }
        });
    }

    pub fn is_running(&self) -> bool {
        self.compute.is_running() && self.proxies.is_running()
    }
}
