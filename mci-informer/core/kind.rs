use std::fmt::Display;

use super::{ALL, CONFIG_MAPS, DAEMON_SETS, DEPLOYMENTS, EVENTS, JOBS, PODS, REPLICA_SETS, SECRETS, SERVICES, STATEFUL_SETS};

#[cfg(test)]
#[path = "./kind.tests.rs"]
mod kind_tests;

/// Represents watched resource kind.\
/// **Note** that the set of kinds is open, unknown kinds are kept as [`ResourceKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Pods,
    Services,
    ConfigMaps,
    Secrets,
    Deployments,
    StatefulSets,
    DaemonSets,
    ReplicaSets,
    Jobs,
    Events,
    Other(String),
}

impl ResourceKind {
    /// All well known resource kinds.
    pub const KNOWN: [ResourceKind; 10] = [
        ResourceKind::Pods,
        ResourceKind::Services,
        ResourceKind::ConfigMaps,
        ResourceKind::Secrets,
        ResourceKind::Deployments,
        ResourceKind::StatefulSets,
        ResourceKind::DaemonSets,
        ResourceKind::ReplicaSets,
        ResourceKind::Jobs,
        ResourceKind::Events,
    ];

    /// Returns lowercase plural name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Pods => PODS,
            ResourceKind::Services => SERVICES,
            ResourceKind::ConfigMaps => CONFIG_MAPS,
            ResourceKind::Secrets => SECRETS,
            ResourceKind::Deployments => DEPLOYMENTS,
            ResourceKind::StatefulSets => STATEFUL_SETS,
            ResourceKind::DaemonSets => DAEMON_SETS,
            ResourceKind::ReplicaSets => REPLICA_SETS,
            ResourceKind::Jobs => JOBS,
            ResourceKind::Events => EVENTS,
            ResourceKind::Other(name) => name,
        }
    }

    /// Returns singular `PascalCase` name of the well known kind.
    pub fn singular(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Pods => Some("Pod"),
            ResourceKind::Services => Some("Service"),
            ResourceKind::ConfigMaps => Some("ConfigMap"),
            ResourceKind::Secrets => Some("Secret"),
            ResourceKind::Deployments => Some("Deployment"),
            ResourceKind::StatefulSets => Some("StatefulSet"),
            ResourceKind::DaemonSets => Some("DaemonSet"),
            ResourceKind::ReplicaSets => Some("ReplicaSet"),
            ResourceKind::Jobs => Some("Job"),
            ResourceKind::Events => Some("Event"),
            ResourceKind::Other(_) => None,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ResourceKind {
    fn from(value: &str) -> Self {
        let value = value.trim();
        ResourceKind::KNOWN
            .into_iter()
            .find(|kind| {
                value.eq_ignore_ascii_case(kind.as_str()) || kind.singular().is_some_and(|s| value.eq_ignore_ascii_case(s))
            })
            .unwrap_or_else(|| ResourceKind::Other(value.to_lowercase()))
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

/// Selects resource kinds for the store queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindSelector {
    /// Every registered kind.
    All,

    /// Only the specified kind.
    Only(ResourceKind),
}

impl KindSelector {
    /// Returns `true` if selector matches the `kind`.
    pub fn matches(&self, kind: &ResourceKind) -> bool {
        match self {
            KindSelector::All => true,
            KindSelector::Only(selected) => selected == kind,
        }
    }
}

impl From<&str> for KindSelector {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case(ALL) {
            KindSelector::All
        } else {
            KindSelector::Only(value.into())
        }
    }
}

impl From<ResourceKind> for KindSelector {
    fn from(value: ResourceKind) -> Self {
        KindSelector::Only(value)
    }
}

impl From<&ResourceKind> for KindSelector {
    fn from(value: &ResourceKind) -> Self {
        KindSelector::Only(value.clone())
    }
}
