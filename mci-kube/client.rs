use kube::api::{ApiResource, DynamicObject};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::Scope;
use kube::{Api, Client, Config};
use std::path::Path;

/// Possible errors from building kubernetes client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Failed to process kube configuration.
    #[error("failed to process kube configuration: {0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),

    /// Failed to infer kube configuration from the environment.
    #[error("failed to infer kube configuration: {0}")]
    InferConfigError(#[from] kube::config::InferConfigError),

    /// Failed to build kubernetes client or to reach the cluster.
    #[error("failed to build kubernetes client: {0}")]
    KubeError(#[from] kube::Error),

    /// Resource kind is not served by the cluster.
    #[error("resource kind '{0}' was not found in the cluster")]
    UnknownKind(String),
}

/// Wrapper for the kubernetes [`Client`] of a single cluster.
pub struct KubernetesClient {
    client: Client,
    context: Option<String>,
    k8s_version: String,
}

impl KubernetesClient {
    /// Creates new [`KubernetesClient`] instance and verifies it can reach the cluster.\
    /// Without `config_path` the configuration is inferred from the environment (or the default kubeconfig).
    pub async fn new(config_path: Option<&Path>, context: Option<&str>, insecure: bool) -> Result<Self, ClientError> {
        let options = KubeConfigOptions {
            context: context.map(String::from),
            cluster: None,
            user: None,
        };

        let mut config = match config_path {
            Some(path) => Config::from_custom_kubeconfig(Kubeconfig::read_from(path)?, &options).await?,
            None if context.is_some() => Config::from_kubeconfig(&options).await?,
            None => Config::infer().await?,
        };

        if insecure {
            config.accept_invalid_certs = true;
        }

        let client = Client::try_from(config)?;
        let k8s_version = client.apiserver_version().await?.git_version;

        Ok(Self {
            client,
            context: context.map(String::from),
            k8s_version,
        })
    }

    /// Returns cloned kubernetes client that can be consumed.
    pub fn get_client(&self) -> Client {
        self.client.clone()
    }

    /// Returns kube context used by the client, `None` means the current one.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns kubernetes API version.
    pub fn k8s_version(&self) -> &str {
        &self.k8s_version
    }
}

/// Gets dynamic api client for the given resource and namespace.\
/// Cluster scoped resources and `None` namespace give an api for all namespaces.
pub fn get_dynamic_api(ar: &ApiResource, scope: &Scope, client: Client, ns: Option<&str>) -> Api<DynamicObject> {
    match (scope, ns) {
        (Scope::Namespaced, Some(namespace)) => Api::namespaced_with(client, namespace, ar),
        _ => Api::all_with(client, ar),
    }
}
