use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{NamespaceScope, ResourceKind, SharedObject};

/// Possible errors from the [`WatchProvider`].
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// Resource kind cannot be resolved or watched in the source.
    #[error("resource kind '{kind}' is not available in '{cluster}'")]
    UnsupportedKind { cluster: String, kind: ResourceKind },

    /// Call to the source API failed.
    #[error("source API call failed: {0}")]
    Api(#[from] kube::Error),
}

/// Read-only view of the objects mirrored locally by one watcher.\
/// **Note** that it must be safe to read while its owning watcher mutates it.
pub trait SourceCache: Send + Sync {
    /// Returns all objects held by the cache.
    fn list(&self) -> Vec<SharedObject>;

    /// Returns keys of all objects held by the cache.
    fn list_keys(&self) -> Vec<String>;

    /// Returns object for the specified `namespace/name` key.
    fn get_by_key(&self, key: &str) -> Option<SharedObject>;

    /// Returns `true` once the cache reflects a complete initial listing.
    fn has_synced(&self) -> bool;
}

/// Callbacks invoked by a watcher for every observed mutation.
pub trait EventSink: Send + Sync {
    fn on_add(&self, object: SharedObject);
    fn on_update(&self, old: SharedObject, new: SharedObject);
    fn on_delete(&self, object: SharedObject);
}

/// What to watch within one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub kind: ResourceKind,
    pub namespace: NamespaceScope,
}

impl WatchRequest {
    /// Creates new [`WatchRequest`] instance.
    pub fn new(kind: ResourceKind, namespace: NamespaceScope) -> Self {
        Self { kind, namespace }
    }
}

/// Started (but not yet running) watcher.
pub struct Watch {
    /// Cache maintained by the watcher.
    pub cache: Arc<dyn SourceCache>,

    /// Watch loop, it must end when the cancellation token passed to [`WatchProvider::start_watch`] is cancelled.
    pub task: BoxFuture<'static, ()>,
}

/// Resource Watch Provider for a single source (cluster).
pub trait WatchProvider: Send + Sync {
    /// Returns name of the source.
    fn source(&self) -> &str;

    /// Prepares a watcher for the `request`, events are delivered to `sink`.
    fn start_watch(
        &self,
        request: &WatchRequest,
        sink: Arc<dyn EventSink>,
        cancellation_token: CancellationToken,
    ) -> Result<Watch, ProviderError>;

    /// Lists namespaces that currently exist in the source.
    fn enumerate_namespaces(&self) -> BoxFuture<'_, Result<Vec<String>, ProviderError>>;

    /// Returns `true` if objects of the `kind` live in namespaces.
    fn is_namespaced(&self, kind: &ResourceKind) -> bool {
        let _ = kind;
        true
    }
}
