//! gameserver-operator - reconciles database-managed game servers and proxies
//! into Kubernetes.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Reads configuration from the environment
//! - Connects the desired-state database and the Kubernetes client
//! - Starts the health server, both entity controllers and the reflector

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use gameserver_operator::{Operator, OperatorConfig};
use gameserver_operator::client::KubeCluster;
use gameserver_operator::controller::context::Context;
use gameserver_operator::desired::PgDesiredStateStore;
use gameserver_operator::health::{HealthState, run_health_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gameserver_operator=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting gameserver-operator");

    let config = OperatorConfig::from_env()?;
    info!(
        namespace = %config.namespace,
        poll_interval_secs = config.poll_interval.as_secs(),
        reflector_enabled = config.reflector_enabled,
        "Loaded configuration"
    );

    let store = PgDesiredStateStore::connect(&config.database_url, config.database_max_connections)
        .await?;
    let cluster = KubeCluster::try_default(config.namespace.clone()).await?;
    info!("Connected to Kubernetes cluster");

    // Create shared health state
    let health_state = Arc::new(HealthState::new());

    // Start health server immediately so liveness works during startup
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let ctx = Arc::new(Context::new(
        Arc::new(cluster),
        Arc::new(store),
        config.manifest_settings(),
        Some(health_state.clone()),
    ));
    let mut operator = Operator::new(ctx, &config);
    operator.start();
    health_state.set_ready(true).await;

    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");
        }
    }

    // Mark as not ready to stop receiving new work
    health_state.set_ready(false).await;
    info!("Marked operator as not ready");

    // In-flight cycles run to completion
    operator.stop().await;

    info!("Operator stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the operator cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
