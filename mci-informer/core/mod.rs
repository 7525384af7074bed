pub const ALL: &str = "all";
pub const PODS: &str = "pods";
pub const SERVICES: &str = "services";
pub const CONFIG_MAPS: &str = "configmaps";
pub const SECRETS: &str = "secrets";
pub const DEPLOYMENTS: &str = "deployments";
pub const STATEFUL_SETS: &str = "statefulsets";
pub const DAEMON_SETS: &str = "daemonsets";
pub const REPLICA_SETS: &str = "replicasets";
pub const JOBS: &str = "jobs";
pub const EVENTS: &str = "events";

pub use self::event::{
    ChangeEvent, EVENT_ADD, EVENT_DELETE, EVENT_UPDATE, EventIdentity, EventKind, SharedObject, object_key,
};
pub use self::kind::{KindSelector, ResourceKind};
pub use self::namespace::NamespaceScope;

mod event;
mod kind;
mod namespace;
