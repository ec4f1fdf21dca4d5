//! Last-applied spec cache.
//!
//! Each controller owns one cache, keyed by entity id. The cache is not
//! persisted: after a restart every entity looks uncached, and the first
//! cycle re-applies all of them.

use std::collections::HashMap;

use crate::desired::DesiredSpec;

/// Key/value store of last-applied specs.
///
/// Only the owning controller's sync loop mutates it, and cycles never
/// overlap, so implementations need no internal locking.
pub trait SpecCache<S: DesiredSpec>: Send + Sync {
    fn get(&self, id: &str) -> Option<&S>;

    /// Record `spec` as applied, replacing any previous entry.
    fn insert(&mut self, spec: S);

    fn remove(&mut self, id: &str) -> Option<S>;

    /// Ids currently cached, in no particular order.
    fn ids(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local [`SpecCache`].
#[derive(Debug, Clone)]
pub struct InMemorySpecCache<S> {
    entries: HashMap<String, S>,
}

impl<S> Default for InMemorySpecCache<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S> InMemorySpecCache<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: DesiredSpec> SpecCache<S> for InMemorySpecCache<S> {
    fn get(&self, id: &str) -> Option<&S> {
        self.entries.get(id)
    }

    fn insert(&mut self, spec: S) {
        self.entries.insert(spec.id().to_string(), spec);
    }

    fn remove(&mut self, id: &str) -> Option<S> {
        self.entries.remove(id)
    }

    fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
