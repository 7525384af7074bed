use std::sync::Arc;

use crate::{ChangeEvent, EventFunnel, EventKind, EventSink, ResourceKind, SharedObject, object_key};

/// [`EventSink`] that turns watcher callbacks into [`ChangeEvent`]s pushed to the funnel.
pub struct FunnelSink {
    source: String,
    kind: ResourceKind,
    retain_objects: bool,
    funnel: Arc<EventFunnel>,
}

impl FunnelSink {
    /// Creates new [`FunnelSink`] instance.
    pub fn new(source: String, kind: ResourceKind, retain_objects: bool, funnel: Arc<EventFunnel>) -> Self {
        Self {
            source,
            kind,
            retain_objects,
            funnel,
        }
    }

    fn emit(&self, event: EventKind, object: SharedObject) {
        let Some(key) = object_key(&object) else {
            tracing::warn!(source = %self.source, kind = %self.kind, %event, "Object without a name, event dropped");
            return;
        };

        let mut change = ChangeEvent::new(self.source.as_str(), event, self.kind.clone(), key);
        if self.retain_objects {
            change = change.with_object(object);
        }

        if let Err(error) = self.funnel.push(change) {
            tracing::debug!(source = %self.source, kind = %self.kind, %event, "Event dropped: {error}");
        }
    }
}

impl EventSink for FunnelSink {
    fn on_add(&self, object: SharedObject) {
        self.emit(EventKind::Add, object);
    }

    fn on_update(&self, _old: SharedObject, new: SharedObject) {
        self.emit(EventKind::Update, new);
    }

    fn on_delete(&self, object: SharedObject) {
        self.emit(EventKind::Delete, object);
    }
}
