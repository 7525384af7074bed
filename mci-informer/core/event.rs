use kube::api::DynamicObject;
use std::fmt::Display;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::ResourceKind;

#[cfg(test)]
#[path = "./event.tests.rs"]
mod event_tests;

pub const EVENT_ADD: &str = "add";
pub const EVENT_UPDATE: &str = "update";
pub const EVENT_DELETE: &str = "delete";

/// Kubernetes object shared between the local caches and the emitted events.
pub type SharedObject = Arc<DynamicObject>;

/// Type of the observed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Object was added.
    Add,

    /// Object was modified, captures the modified object.
    Update,

    /// Object was deleted, captures the object at the last known state.
    Delete,
}

impl EventKind {
    /// Returns event kind as string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Add => EVENT_ADD,
            EventKind::Update => EVENT_UPDATE,
            EventKind::Delete => EVENT_DELETE,
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity used for deduplication: the same key in different sources or kinds never collides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventIdentity {
    pub source: String,
    pub kind: ResourceKind,
    pub key: String,
}

impl Display for EventIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.kind, self.key)
    }
}

/// Immutable record of one observed mutation.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Name of the watch source (cluster) that observed the change.
    pub source: String,
    pub event: EventKind,
    pub kind: ResourceKind,
    /// Object key in `namespace/name` form (just `name` for cluster scoped objects).
    pub key: String,
    /// Object snapshot, present only if retaining snapshots was enabled for the resource kind.
    pub object: Option<SharedObject>,
    pub created_at: OffsetDateTime,
}

impl ChangeEvent {
    /// Creates new [`ChangeEvent`] instance without the object snapshot.
    pub fn new(source: impl Into<String>, event: EventKind, kind: ResourceKind, key: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            event,
            kind,
            key: key.into(),
            object: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attaches object snapshot to the event.
    pub fn with_object(mut self, object: SharedObject) -> Self {
        self.object = Some(object);
        self
    }

    /// Returns deduplication identity of the event.
    pub fn identity(&self) -> EventIdentity {
        EventIdentity {
            source: self.source.clone(),
            kind: self.kind.clone(),
            key: self.key.clone(),
        }
    }
}

/// Builds `namespace/name` key for the object, or just `name` for cluster scoped objects.\
/// Returns `None` if object has no name.
pub fn object_key(object: &DynamicObject) -> Option<String> {
    let name = object.metadata.name.as_deref().filter(|n| !n.is_empty())?;
    match object.metadata.namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => Some(format!("{namespace}/{name}")),
        _ => Some(name.to_owned()),
    }
}
