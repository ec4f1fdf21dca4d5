//! Controller module for gameserver-operator.
//!
//! Contains the sync loops that converge the cluster with the database,
//! change detection, the last-applied cache and error handling.
//!
//! Three independent loops run side by side:
//! - compute controller (`EntityController<ComputeSpec>`)
//! - proxy controller (`EntityController<ProxySpec>`)
//! - cluster-state reflector (`ReflectorLoop`)

// Shared modules
pub mod common;
pub mod context;
pub mod error;

pub mod cache;
pub mod drift;
pub mod entity_controller;
pub mod reflector;

pub use cache::{InMemorySpecCache, SpecCache};
pub use entity_controller::{EntityController, SyncLoop, SyncReport, entity_controller};
pub use reflector::{ClusterStateReflector, ReflectionReport, ReflectorLoop, reflector_loop};
