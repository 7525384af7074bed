use mci_informer::{SharedObject, SourceCache};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Local mirror of the watched objects, keyed by `namespace/name`.\
/// It is written only by its watcher and can be read from any thread.
#[derive(Default)]
pub struct ObjectCache {
    objects: RwLock<BTreeMap<String, SharedObject>>,
    synced: AtomicBool,
}

impl ObjectCache {
    /// Inserts or replaces object under the `key`, returns the replaced one.
    pub fn upsert(&self, key: String, object: SharedObject) -> Option<SharedObject> {
        self.write().insert(key, object)
    }

    /// Removes object under the `key`.
    pub fn remove(&self, key: &str) -> Option<SharedObject> {
        self.write().remove(key)
    }

    /// Replaces all objects at once, returns the previous content.
    pub fn replace(&self, objects: BTreeMap<String, SharedObject>) -> BTreeMap<String, SharedObject> {
        std::mem::replace(&mut *self.write(), objects)
    }

    /// Marks the cache as synchronized with its source, returns `true` the first time.
    pub fn mark_synced(&self) -> bool {
        !self.synced.swap(true, Ordering::AcqRel)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, SharedObject>> {
        self.objects.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SharedObject>> {
        self.objects.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SourceCache for ObjectCache {
    fn list(&self) -> Vec<SharedObject> {
        self.read().values().cloned().collect()
    }

    fn list_keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn get_by_key(&self, key: &str) -> Option<SharedObject> {
        self.read().get(key).cloned()
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}
