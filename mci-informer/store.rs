use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{KindSelector, ResourceKind, SharedObject, SourceCache};

#[cfg(test)]
#[path = "./store.tests.rs"]
mod store_tests;

/// Read side fan-out over all [`SourceCache`]s, grouped by resource kind.\
/// It is populated once when the watch set starts and is never modified afterwards.
#[derive(Default, Clone)]
pub struct AggregatedStore {
    caches: BTreeMap<ResourceKind, Vec<Arc<dyn SourceCache>>>,
}

impl AggregatedStore {
    /// Creates new empty [`AggregatedStore`] instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `cache` under the specified resource `kind`.
    pub fn register(&mut self, kind: ResourceKind, cache: Arc<dyn SourceCache>) {
        self.caches.entry(kind).or_default().push(cache);
    }

    /// Returns objects from every cache that matches the `selector`.\
    /// Objects are not deduplicated across sources.
    pub fn list(&self, selector: impl Into<KindSelector>) -> Vec<SharedObject> {
        let selector = selector.into();
        self.caches(&selector).flat_map(|cache| cache.list()).collect()
    }

    /// Returns keys from every cache that matches the `selector`.
    pub fn list_keys(&self, selector: impl Into<KindSelector>) -> Vec<String> {
        let selector = selector.into();
        self.caches(&selector).flat_map(|cache| cache.list_keys()).collect()
    }

    /// Looks for the `key` in every cache that matches the `selector`.\
    /// Returns all found objects and `true` if the key was found in at least one cache.
    pub fn get_by_key(&self, selector: impl Into<KindSelector>, key: &str) -> (Vec<SharedObject>, bool) {
        let selector = selector.into();
        let found = self
            .caches(&selector)
            .filter_map(|cache| cache.get_by_key(key))
            .collect::<Vec<_>>();
        let exists = !found.is_empty();

        (found, exists)
    }

    /// Returns registered resource kinds.
    pub fn kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.caches.keys()
    }

    /// Returns number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.values().map(Vec::len).sum()
    }

    /// Returns `true` if no cache is registered.
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Returns `true` if every registered cache completed its initial synchronization.
    pub fn has_synced(&self) -> bool {
        self.caches.values().flatten().all(|cache| cache.has_synced())
    }

    fn caches<'a>(&'a self, selector: &'a KindSelector) -> impl Iterator<Item = &'a Arc<dyn SourceCache>> + 'a {
        self.caches
            .iter()
            .filter(move |(kind, _)| selector.matches(kind))
            .flat_map(|(_, caches)| caches.iter())
    }
}
