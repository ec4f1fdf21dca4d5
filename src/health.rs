//! Health server for Kubernetes probes and Prometheus metrics.
//!
//! Provides:
//! - `/healthz` - Liveness probe (always returns 200 if server is running)
//! - `/readyz` - Readiness probe (returns 200 when ready to serve traffic)
//! - `/metrics` - Prometheus metrics endpoint

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

use crate::desired::EntityKind;

/// Labels for per-entity metrics (`compute` or `proxy`)
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct EntityLabels {
    pub entity: String,
}

impl EncodeLabelSet for EntityLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("entity", self.entity.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

impl EntityLabels {
    fn of(entity: EntityKind) -> Self {
        Self {
            entity: entity.as_str().to_string(),
        }
    }
}

/// Shared metrics for the operator
pub struct Metrics {
    /// Completed sync cycles
    pub sync_cycles_total: Family<EntityLabels, Counter>,
    /// Sync cycles that ended early on an error
    pub sync_errors_total: Family<EntityLabels, Counter>,
    /// Sync cycle duration histogram
    pub sync_duration_seconds: Family<EntityLabels, Histogram>,
    /// Instances applied (created or re-applied after drift)
    pub applies_total: Family<EntityLabels, Counter>,
    /// Instances removed after disappearing from the database
    pub removals_total: Family<EntityLabels, Counter>,
    /// Entries in the last-applied cache
    pub cached_entities: Family<EntityLabels, Gauge>,
    /// Reflected custom resources after the last reflection cycle
    pub reflected_objects: Family<EntityLabels, Gauge>,
    /// Per-object reflection failures
    pub reflection_failures_total: Family<EntityLabels, Counter>,
    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("gameserver_operator");

        let sync_cycles_total = Family::<EntityLabels, Counter>::default();
        registry.register(
            "sync_cycles",
            "Total number of completed sync cycles",
            sync_cycles_total.clone(),
        );

        let sync_errors_total = Family::<EntityLabels, Counter>::default();
        registry.register(
            "sync_errors",
            "Total number of sync cycles aborted by an error",
            sync_errors_total.clone(),
        );

        let sync_duration_seconds =
            Family::<EntityLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.001, 2.0, 15))
            });
        registry.register(
            "sync_duration_seconds",
            "Duration of sync cycles in seconds",
            sync_duration_seconds.clone(),
        );

        let applies_total = Family::<EntityLabels, Counter>::default();
        registry.register(
            "applies",
            "Total number of instances applied to the cluster",
            applies_total.clone(),
        );

        let removals_total = Family::<EntityLabels, Counter>::default();
        registry.register(
            "removals",
            "Total number of instances removed from the cluster",
            removals_total.clone(),
        );

        let cached_entities = Family::<EntityLabels, Gauge>::default();
        registry.register(
            "cached_entities",
            "Number of entries in the last-applied cache",
            cached_entities.clone(),
        );

        let reflected_objects = Family::<EntityLabels, Gauge>::default();
        registry.register(
            "reflected_objects",
            "Number of reflected custom resources",
            reflected_objects.clone(),
        );

        let reflection_failures_total = Family::<EntityLabels, Counter>::default();
        registry.register(
            "reflection_failures",
            "Total number of per-object reflection failures",
            reflection_failures_total.clone(),
        );

        Self {
            sync_cycles_total,
            sync_errors_total,
            sync_duration_seconds,
            applies_total,
            removals_total,
            cached_entities,
            reflected_objects,
            reflection_failures_total,
            registry,
        }
    }

    /// Record a completed sync cycle
    pub fn record_cycle(&self, entity: EntityKind, duration_secs: f64) {
        let labels = EntityLabels::of(entity);
        self.sync_cycles_total.get_or_create(&labels).inc();
        self.sync_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a sync cycle that ended early
    pub fn record_sync_error(&self, entity: EntityKind) {
        self.sync_errors_total
            .get_or_create(&EntityLabels::of(entity))
            .inc();
    }

    /// Record applied and removed instances
    pub fn record_changes(&self, entity: EntityKind, applied: u64, removed: u64) {
        let labels = EntityLabels::of(entity);
        self.applies_total.get_or_create(&labels).inc_by(applied);
        self.removals_total.get_or_create(&labels).inc_by(removed);
    }

    /// Update the cache size gauge
    pub fn set_cached_entities(&self, entity: EntityKind, count: i64) {
        self.cached_entities
            .get_or_create(&EntityLabels::of(entity))
            .set(count);
    }

    /// Record the outcome of a reflection cycle
    pub fn record_reflection(&self, entity: EntityKind, reflected: i64, failures: u64) {
        let labels = EntityLabels::of(entity);
        self.reflected_objects.get_or_create(&labels).set(reflected);
        self.reflection_failures_total
            .get_or_create(&labels)
            .inc_by(failures);
    }

    /// Record a reflection cycle that could not list its objects.
    ///
    /// Leaves the object gauge alone; the objects are still there.
    pub fn record_reflection_failure(&self, entity: EntityKind) {
        self.reflection_failures_total
            .get_or_create(&EntityLabels::of(entity))
            .inc();
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the operator is ready (sync loops started, not shutting down)
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
    /// Last completed sync cycle (Unix epoch seconds)
    pub last_sync: AtomicU64,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
            last_sync: AtomicU64::new(0),
        }
    }

    /// Mark the operator as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the operator is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }

    /// Stamp the time of the last completed sync cycle
    pub fn touch_last_sync(&self) {
        let now = jiff::Timestamp::now().as_second().max(0) as u64;
        self.last_sync.store(now, Ordering::Relaxed);
    }
}

/// Liveness probe handler
///
/// Returns 200 OK if the process is alive.
/// This is a simple check - if we can respond, we're alive.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Returns 200 OK if the operator is ready to serve.
/// Returns 503 Service Unavailable if not ready.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server
///
/// Binds to 0.0.0.0 on `port` and serves health/metrics endpoints.
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
