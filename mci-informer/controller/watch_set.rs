use mci_config::ResourceConfig;
use std::sync::Arc;

use crate::{NamespaceScope, ProviderError, ResourceKind, WatchProvider, WatchRequest};

/// Resource kind to watch within a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub namespace: NamespaceScope,
    pub retain_objects: bool,
}

impl ResourceSpec {
    /// Creates new [`ResourceSpec`] instance.
    pub fn new(kind: impl Into<ResourceKind>, namespace: impl Into<NamespaceScope>, retain_objects: bool) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            retain_objects,
        }
    }
}

impl From<&ResourceConfig> for ResourceSpec {
    fn from(value: &ResourceConfig) -> Self {
        Self::new(value.kind.as_str(), value.namespace.as_str(), value.retain_objects)
    }
}

/// Watch source together with the resources to watch in it.
pub struct SourceSpec {
    pub provider: Arc<dyn WatchProvider>,
    pub resources: Vec<ResourceSpec>,
}

impl SourceSpec {
    /// Creates new [`SourceSpec`] instance.
    pub fn new(provider: Arc<dyn WatchProvider>, resources: Vec<ResourceSpec>) -> Self {
        Self { provider, resources }
    }

    /// Returns name of the source.
    pub fn name(&self) -> &str {
        self.provider.source()
    }
}

/// Single watcher of the watch set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Index of the source in the watch set.
    pub source: usize,
    pub request: WatchRequest,
    pub retain_objects: bool,
}

/// Expands configured resources into watch targets.\
/// Resources watched in all namespaces get one target per namespace that exists right now,
/// namespaces created later are not picked up.
pub async fn expand_targets(sources: &[SourceSpec]) -> Result<Vec<WatchTarget>, ProviderError> {
    let mut targets: Vec<WatchTarget> = Vec::new();
    for (index, source) in sources.iter().enumerate() {
        let mut namespaces: Option<Vec<String>> = None;
        for resource in &source.resources {
            let scopes = if resource.namespace.is_all() && source.provider.is_namespaced(&resource.kind) {
                if namespaces.is_none() {
                    let listed = source.provider.enumerate_namespaces().await?;
                    tracing::info!(source = source.name(), count = listed.len(), "Namespaces enumerated");
                    namespaces = Some(listed);
                }

                namespaces
                    .iter()
                    .flatten()
                    .map(|namespace| NamespaceScope::named(namespace.as_str()))
                    .collect::<Vec<_>>()
            } else {
                vec![resource.namespace.clone()]
            };

            for scope in scopes {
                let request = WatchRequest::new(resource.kind.clone(), scope);
                if let Some(existing) = targets.iter_mut().find(|t| t.source == index && t.request == request) {
                    existing.retain_objects |= resource.retain_objects;
                    continue;
                }

                targets.push(WatchTarget {
                    source: index,
                    request,
                    retain_objects: resource.retain_objects,
                });
            }
        }
    }

    Ok(targets)
}
