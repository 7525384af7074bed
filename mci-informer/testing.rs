use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ApiResource, DynamicObject};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    EventSink, NamespaceScope, ProviderError, ResourceKind, SharedObject, SourceCache, Watch, WatchProvider,
    WatchRequest, object_key,
};

pub fn pod(namespace: &str, name: &str) -> SharedObject {
    Arc::new(DynamicObject::new(name, &ApiResource::erase::<Pod>(&())).within(namespace))
}

/// In-memory [`SourceCache`] with a manually controlled sync flag.
#[derive(Default)]
pub struct FakeCache {
    objects: RwLock<BTreeMap<String, SharedObject>>,
    synced: AtomicBool,
}

impl FakeCache {
    pub fn with(objects: &[SharedObject]) -> Arc<Self> {
        let cache = Self::default();
        for object in objects {
            cache.insert(Arc::clone(object));
        }

        cache.set_synced(true);
        Arc::new(cache)
    }

    pub fn insert(&self, object: SharedObject) {
        if let Some(key) = object_key(&object)
            && let Ok(mut objects) = self.objects.write()
        {
            objects.insert(key, object);
        }
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::Relaxed);
    }
}

impl SourceCache for FakeCache {
    fn list(&self) -> Vec<SharedObject> {
        self.objects.read().unwrap().values().cloned().collect()
    }

    fn list_keys(&self) -> Vec<String> {
        self.objects.read().unwrap().keys().cloned().collect()
    }

    fn get_by_key(&self, key: &str) -> Option<SharedObject> {
        self.objects.read().unwrap().get(key).cloned()
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }
}

/// Watcher started by the [`FakeProvider`].
pub struct StartedWatch {
    pub request: WatchRequest,
    pub sink: Arc<dyn EventSink>,
    pub cache: Arc<FakeCache>,
}

/// [`WatchProvider`] that records started watches and lets tests drive their events.
pub struct FakeProvider {
    source: String,
    namespaces: Option<Vec<String>>,
    sync_immediately: bool,
    unsupported: Option<ResourceKind>,
    pub started: Mutex<Vec<StartedWatch>>,
    pub running: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            namespaces: Some(vec!["default".to_owned(), "kube-system".to_owned()]),
            sync_immediately: true,
            unsupported: None,
            started: Mutex::new(Vec::new()),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn never_syncing(mut self) -> Self {
        self.sync_immediately = false;
        self
    }

    pub fn without_namespaces(mut self) -> Self {
        self.namespaces = None;
        self
    }

    pub fn rejecting(mut self, kind: ResourceKind) -> Self {
        self.unsupported = Some(kind);
        self
    }

    pub fn requests(&self) -> Vec<WatchRequest> {
        self.started.lock().unwrap().iter().map(|w| w.request.clone()).collect()
    }

    pub fn sink(&self, index: usize) -> Arc<dyn EventSink> {
        Arc::clone(&self.started.lock().unwrap()[index].sink)
    }

    pub fn cache(&self, index: usize) -> Arc<FakeCache> {
        Arc::clone(&self.started.lock().unwrap()[index].cache)
    }

    pub fn sync_all(&self) {
        for watch in self.started.lock().unwrap().iter() {
            watch.cache.set_synced(true);
        }
    }
}

impl WatchProvider for FakeProvider {
    fn source(&self) -> &str {
        &self.source
    }

    fn start_watch(
        &self,
        request: &WatchRequest,
        sink: Arc<dyn EventSink>,
        cancellation_token: CancellationToken,
    ) -> Result<Watch, ProviderError> {
        if self.unsupported.as_ref() == Some(&request.kind) {
            return Err(ProviderError::UnsupportedKind {
                cluster: self.source.clone(),
                kind: request.kind.clone(),
            });
        }

        let cache = Arc::new(FakeCache::default());
        cache.set_synced(self.sync_immediately);
        self.started.lock().unwrap().push(StartedWatch {
            request: request.clone(),
            sink,
            cache: Arc::clone(&cache),
        });

        let running = Arc::clone(&self.running);
        Ok(Watch {
            cache,
            task: Box::pin(async move {
                running.fetch_add(1, Ordering::SeqCst);
                cancellation_token.cancelled().await;
                running.fetch_sub(1, Ordering::SeqCst);
            }),
        })
    }

    fn enumerate_namespaces(&self) -> BoxFuture<'_, Result<Vec<String>, ProviderError>> {
        let result = self.namespaces.clone().ok_or_else(|| ProviderError::UnsupportedKind {
            cluster: self.source.clone(),
            kind: ResourceKind::Other("namespaces".to_owned()),
        });

        Box::pin(async move { result })
    }

    fn is_namespaced(&self, kind: &ResourceKind) -> bool {
        !matches!(kind, ResourceKind::Other(name) if name == "nodes")
    }
}

pub fn scope(namespace: &str) -> NamespaceScope {
    NamespaceScope::from(namespace)
}
