//! Entity controller.
//!
//! One [`SyncLoop`] per entity kind compares the database with its cache of
//! last-applied specs and drives the cluster toward the database. Each cycle:
//!
//! 1. Load every desired spec of the kind.
//! 2. Remove the objects of cached entities missing from the database, then
//!    evict them.
//! 3. Apply new or drifted specs, retire objects a drifted spec no longer
//!    owns, and update the cache entry.
//!
//! The first error aborts the rest of the cycle. The cache only changes after
//! the corresponding cluster writes succeeded, so the next cycle retries from
//! a consistent point.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::controller::cache::{InMemorySpecCache, SpecCache};
use crate::controller::common::{PeriodicLoop, PeriodicTask};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::desired::DesiredSpec;
use crate::resources::apply::ManifestApplier;

/// What one sync cycle did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Specs applied because they were new or drifted
    pub applied: usize,
    /// Entities removed after disappearing from the database
    pub removed: usize,
    /// Objects deleted because a drifted spec no longer owns them
    pub retired: usize,
    /// Specs skipped because they match the cache
    pub unchanged: usize,
}

/// Sync state of one entity kind.
pub struct SyncLoop<S: DesiredSpec> {
    ctx: Arc<Context>,
    applier: ManifestApplier,
    cache: Box<dyn SpecCache<S>>,
}

impl<S: DesiredSpec> SyncLoop<S> {
    /// Sync loop with an empty in-memory cache.
    pub fn new(ctx: Arc<Context>) -> Self {
        Self::with_cache(ctx, Box::new(InMemorySpecCache::new()))
    }

    /// Sync loop with a caller-provided cache.
    pub fn with_cache(ctx: Arc<Context>, cache: Box<dyn SpecCache<S>>) -> Self {
        let applier = ManifestApplier::new(ctx.cluster.clone());
        Self {
            ctx,
            applier,
            cache,
        }
    }

    pub fn cache(&self) -> &dyn SpecCache<S> {
        self.cache.as_ref()
    }

    /// Run one sync cycle, stopping at the first error.
    pub async fn sync_once(&mut self) -> Result<SyncReport> {
        let settings = &self.ctx.settings;
        let specs = S::load_all(self.ctx.store.as_ref()).await?;
        let mut report = SyncReport::default();

        let current: HashSet<&str> = specs.iter().map(|spec| spec.id()).collect();
        let mut stale: Vec<String> = self
            .cache
            .ids()
            .into_iter()
            .filter(|id| !current.contains(id.as_str()))
            .collect();
        stale.sort();

        for id in stale {
            let Some(previous) = self.cache.get(&id) else {
                continue;
            };
            let template = previous.template(settings);
            self.applier.remove(&template).await?;
            self.cache.remove(&id);
            report.removed += 1;
        }

        for spec in specs {
            let previous = match self.cache.get(spec.id()) {
                Some(cached) if !cached.changed(&spec) => {
                    report.unchanged += 1;
                    continue;
                }
                Some(cached) => Some(cached.template(settings)),
                None => None,
            };

            let template = spec.template(settings);
            self.applier.apply(&template).await?;
            if let Some(previous) = previous {
                report.retired += self.applier.retire(&previous, &template).await?;
            }
            self.cache.insert(spec);
            report.applied += 1;
        }

        Ok(report)
    }

    /// Run one cycle and record its outcome. Never fails.
    pub async fn run_cycle(&mut self) -> Option<SyncReport> {
        let start = Instant::now();
        let entity = S::ENTITY;
        let result = self.sync_once().await;
        let health = self.ctx.health_state.as_ref();

        let report = match result {
            Ok(report) => {
                debug!(
                    entity = %entity,
                    applied = report.applied,
                    removed = report.removed,
                    retired = report.retired,
                    unchanged = report.unchanged,
                    "Sync cycle complete"
                );
                if let Some(health) = health {
                    health
                        .metrics
                        .record_cycle(entity, start.elapsed().as_secs_f64());
                    health.metrics.record_changes(
                        entity,
                        report.applied as u64,
                        report.removed as u64,
                    );
                    health.touch_last_sync();
                }
                Some(report)
            }
            Err(e) => {
                error!(entity = %entity, error = %e, "Sync cycle aborted");
                if let Some(health) = health {
                    health.metrics.record_sync_error(entity);
                }
                None
            }
        };

        if let Some(health) = health {
            health
                .metrics
                .set_cached_entities(entity, self.cache.len() as i64);
        }
        report
    }
}

#[async_trait]
impl<S: DesiredSpec> PeriodicTask for SyncLoop<S> {
    fn name(&self) -> String {
        format!("{}-controller", S::ENTITY)
    }

    async fn tick(&mut self) {
        self.run_cycle().await;
    }
}

/// A started or stopped controller for one entity kind.
pub type EntityController<S> = PeriodicLoop<SyncLoop<S>>;

/// Controller with an empty in-memory cache.
pub fn entity_controller<S: DesiredSpec>(
    ctx: Arc<Context>,
    interval: Duration,
) -> EntityController<S> {
    PeriodicLoop::new(SyncLoop::new(ctx), interval)
}
