use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Event, Pod, Secret, Service};
use kube::discovery::{ApiCapabilities, Scope};
use kube::{Client, Discovery, api::ApiResource};
use mci_informer::ResourceKind;
use std::collections::HashMap;

use crate::ClientError;

#[cfg(test)]
#[path = "./registry.tests.rs"]
mod registry_tests;

pub type DiscoveryList = Vec<(ApiResource, ApiCapabilities)>;

/// Maps resource kinds to their API coordinates within one cluster.
#[derive(Clone)]
pub struct KindRegistry {
    entries: HashMap<ResourceKind, (ApiResource, Scope)>,
}

impl Default for KindRegistry {
    /// Creates registry with all well known kinds.
    fn default() -> Self {
        let entries = [
            (ResourceKind::Pods, ApiResource::erase::<Pod>(&())),
            (ResourceKind::Services, ApiResource::erase::<Service>(&())),
            (ResourceKind::ConfigMaps, ApiResource::erase::<ConfigMap>(&())),
            (ResourceKind::Secrets, ApiResource::erase::<Secret>(&())),
            (ResourceKind::Deployments, ApiResource::erase::<Deployment>(&())),
            (ResourceKind::StatefulSets, ApiResource::erase::<StatefulSet>(&())),
            (ResourceKind::DaemonSets, ApiResource::erase::<DaemonSet>(&())),
            (ResourceKind::ReplicaSets, ApiResource::erase::<ReplicaSet>(&())),
            (ResourceKind::Jobs, ApiResource::erase::<Job>(&())),
            (ResourceKind::Events, ApiResource::erase::<Event>(&())),
        ]
        .into_iter()
        .map(|(kind, ar)| (kind, (ar, Scope::Namespaced)))
        .collect();

        Self { entries }
    }
}

impl KindRegistry {
    /// Creates registry that knows all well known kinds and the requested `kinds`.\
    /// Kinds that are not well known are looked up using the API discovery, which runs only if needed.
    pub async fn discover(client: &Client, kinds: &[ResourceKind]) -> Result<Self, ClientError> {
        let mut registry = Self::default();
        let missing = kinds.iter().filter(|k| registry.resolve(k).is_none()).collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(registry);
        }

        let discovery = Discovery::new(client.clone()).run().await?;
        let discovered = convert_to_vector(&discovery);
        tracing::debug!(resources = discovered.len(), "API discovery completed");

        for kind in missing {
            let resources = discovered.iter().map(|(ar, caps)| (ar, &caps.scope));
            let (ar, scope) =
                find_resource(resources, kind.as_str()).ok_or_else(|| ClientError::UnknownKind(kind.to_string()))?;
            tracing::debug!(%kind, api_version = %ar.api_version, "Resource kind discovered");
            registry.register(kind.clone(), ar, scope);
        }

        Ok(registry)
    }

    /// Registers API coordinates for the resource `kind`.
    pub fn register(&mut self, kind: ResourceKind, ar: ApiResource, scope: Scope) {
        self.entries.insert(kind, (ar, scope));
    }

    /// Returns API coordinates for the resource `kind`.
    pub fn resolve(&self, kind: &ResourceKind) -> Option<&(ApiResource, Scope)> {
        self.entries.get(kind)
    }
}

/// Converts [`Discovery`] to vector of [`ApiResource`] and [`ApiCapabilities`] for the preferred versions.
pub fn convert_to_vector(discovery: &Discovery) -> DiscoveryList {
    discovery
        .groups()
        .flat_map(|group| group.recommended_resources())
        .collect()
}

/// Finds resource by its plural name or kind, resources from the core group win.
fn find_resource<'a>(
    resources: impl IntoIterator<Item = (&'a ApiResource, &'a Scope)>,
    name: &str,
) -> Option<(ApiResource, Scope)> {
    resources
        .into_iter()
        .filter(|(ar, _)| ar.plural.eq_ignore_ascii_case(name) || ar.kind.eq_ignore_ascii_case(name))
        .min_by_key(|(ar, _)| !ar.group.is_empty())
        .map(|(ar, scope)| (ar.clone(), scope.clone()))
}
