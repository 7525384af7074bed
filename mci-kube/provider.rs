use futures::future::{BoxFuture, try_join_all};
use k8s_openapi::api::core::v1::Namespace;
use kube::Api;
use kube::api::ListParams;
use kube::discovery::Scope;
use mci_config::{ClusterConfig, Config};
use mci_informer::{EventSink, ProviderError, ResourceKind, Watch, WatchProvider, WatchRequest};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::watcher::{EventsProcessor, ObjectCache, watch};
use crate::{ClientError, KindRegistry, KubernetesClient, get_dynamic_api};

/// [`WatchProvider`] backed by a single Kubernetes cluster.
pub struct KubeWatchProvider {
    name: String,
    client: KubernetesClient,
    registry: KindRegistry,
}

impl KubeWatchProvider {
    /// Connects to the cluster and resolves all resource kinds configured for it.
    pub async fn connect(cluster: &ClusterConfig) -> Result<Self, ClientError> {
        let metadata = &cluster.metadata;
        let client = KubernetesClient::new(
            metadata.config_path.as_deref().map(Path::new),
            metadata.context.as_deref(),
            metadata.insecure,
        )
        .await?;

        let kinds = cluster
            .resources()
            .iter()
            .map(|r| ResourceKind::from(r.kind.as_str()))
            .collect::<Vec<_>>();
        let registry = KindRegistry::discover(&client.get_client(), &kinds).await?;

        tracing::info!(
            cluster = cluster.name(),
            context = client.context().unwrap_or("<current>"),
            version = client.k8s_version(),
            "Connected to cluster"
        );

        Ok(Self {
            name: cluster.name().to_owned(),
            client,
            registry,
        })
    }
}

impl WatchProvider for KubeWatchProvider {
    fn source(&self) -> &str {
        &self.name
    }

    fn start_watch(
        &self,
        request: &WatchRequest,
        sink: Arc<dyn EventSink>,
        cancellation_token: CancellationToken,
    ) -> Result<Watch, ProviderError> {
        let Some((ar, scope)) = self.registry.resolve(&request.kind) else {
            return Err(ProviderError::UnsupportedKind {
                cluster: self.name.clone(),
                kind: request.kind.clone(),
            });
        };

        let api = get_dynamic_api(ar, scope, self.client.get_client(), request.namespace.as_option());
        let cache = Arc::new(ObjectCache::default());
        let processor = EventsProcessor::new(self.name.clone(), request.clone(), Arc::clone(&cache), sink);

        Ok(Watch {
            cache,
            task: Box::pin(watch(api, processor, cancellation_token)),
        })
    }

    fn enumerate_namespaces(&self) -> BoxFuture<'_, Result<Vec<String>, ProviderError>> {
        let api: Api<Namespace> = Api::all(self.client.get_client());
        Box::pin(async move {
            let list = api.list_metadata(&ListParams::default()).await?;
            Ok::<_, ProviderError>(list.items.into_iter().filter_map(|ns| ns.metadata.name).collect())
        })
    }

    fn is_namespaced(&self, kind: &ResourceKind) -> bool {
        self.registry
            .resolve(kind)
            .is_none_or(|(_, scope)| *scope == Scope::Namespaced)
    }
}

/// Connects to every configured cluster.\
/// Fails if any of the clusters cannot be reached, the system never starts partially.
pub async fn connect_all(config: &Config) -> Result<Vec<Arc<dyn WatchProvider>>, ClientError> {
    let providers = try_join_all(config.clusters.iter().map(|cluster| async move {
        KubeWatchProvider::connect(cluster).await.inspect_err(|error| {
            tracing::error!(cluster = cluster.name(), "Cannot connect to cluster: {error}");
        })
    }))
    .await?;

    Ok(providers
        .into_iter()
        .map(|provider| Arc::new(provider) as Arc<dyn WatchProvider>)
        .collect())
}
