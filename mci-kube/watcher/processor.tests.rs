use k8s_openapi::api::core::v1::Pod;
use kube::api::ApiResource;
use mci_informer::{NamespaceScope, ResourceKind, SourceCache};
use std::sync::Mutex;

use super::*;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn record(&self, action: &str, object: &SharedObject) {
        let name = object.metadata.name.clone().unwrap_or_default();
        let version = object.metadata.resource_version.clone().unwrap_or_default();
        self.events.lock().unwrap().push(format!("{action} {name}@{version}"));
    }
}

impl EventSink for RecordingSink {
    fn on_add(&self, object: SharedObject) {
        self.record("add", &object);
    }

    fn on_update(&self, old: SharedObject, new: SharedObject) {
        let old_version = old.metadata.resource_version.clone().unwrap_or_default();
        self.record(&format!("update({old_version})"), &new);
    }

    fn on_delete(&self, object: SharedObject) {
        self.record("delete", &object);
    }
}

fn pod(name: &str, version: &str) -> DynamicObject {
    let mut object = DynamicObject::new(name, &ApiResource::erase::<Pod>(&())).within("default");
    object.metadata.resource_version = Some(version.to_owned());
    object
}

fn processor() -> (EventsProcessor, Arc<ObjectCache>, Arc<RecordingSink>) {
    let cache = Arc::new(ObjectCache::default());
    let sink = Arc::new(RecordingSink::default());
    let request = WatchRequest::new(ResourceKind::Pods, NamespaceScope::named("default"));
    let processor = EventsProcessor::new("c1".to_owned(), request, Arc::clone(&cache), sink.clone());

    (processor, cache, sink)
}

fn feed(processor: &mut EventsProcessor, events: Vec<Event<DynamicObject>>) {
    for event in events {
        assert_eq!(ProcessorResult::Continue, processor.process_event(Ok(Some(event))));
    }
}

#[test]
fn initial_listing_test() {
    let (mut processor, cache, sink) = processor();

    feed(
        &mut processor,
        vec![Event::Init, Event::InitApply(pod("a", "1")), Event::InitApply(pod("b", "1"))],
    );
    assert!(!cache.has_synced());
    assert!(cache.list().is_empty());
    assert!(sink.take().is_empty());

    feed(&mut processor, vec![Event::InitDone]);
    assert!(cache.has_synced());
    assert_eq!(vec!["default/a", "default/b"], cache.list_keys());
    assert_eq!(vec!["add a@1", "add b@1"], sink.take());
}

#[test]
fn apply_and_delete_test() {
    let (mut processor, cache, sink) = processor();
    feed(&mut processor, vec![Event::Init, Event::InitApply(pod("a", "1")), Event::InitDone]);
    sink.take();

    feed(
        &mut processor,
        vec![
            Event::Apply(pod("a", "2")),
            Event::Apply(pod("c", "3")),
            Event::Delete(pod("a", "4")),
        ],
    );

    assert_eq!(vec!["update(1) a@2", "add c@3", "delete a@4"], sink.take());
    assert_eq!(vec!["default/c"], cache.list_keys());
    assert!(cache.get_by_key("default/a").is_none());
}

#[test]
fn relist_reports_the_difference_test() {
    let (mut processor, cache, sink) = processor();
    feed(
        &mut processor,
        vec![
            Event::Init,
            Event::InitApply(pod("a", "1")),
            Event::InitApply(pod("b", "1")),
            Event::InitApply(pod("c", "1")),
            Event::InitDone,
        ],
    );
    sink.take();

    feed(
        &mut processor,
        vec![
            Event::Init,
            Event::InitApply(pod("a", "1")),
            Event::InitApply(pod("b", "5")),
            Event::InitApply(pod("d", "5")),
        ],
    );
    assert_eq!(3, cache.list().len());
    assert!(cache.has_synced());

    feed(&mut processor, vec![Event::InitDone]);

    assert_eq!(vec!["add d@5", "update(1) b@5", "delete c@1"], sink.take());
    assert_eq!(vec!["default/a", "default/b", "default/d"], cache.list_keys());
}

#[test]
fn object_without_name_is_skipped_test() {
    let (mut processor, cache, sink) = processor();
    feed(
        &mut processor,
        vec![
            Event::Init,
            Event::InitApply(pod("", "1")),
            Event::InitDone,
            Event::Apply(pod("", "2")),
            Event::Delete(pod("", "3")),
        ],
    );

    assert!(cache.has_synced());
    assert!(cache.list().is_empty());
    assert!(sink.take().is_empty());
}

#[test]
fn stream_end_restarts_watcher_test() {
    let (mut processor, _, _) = processor();
    assert_eq!(ProcessorResult::Restart, processor.process_event(Ok(None)));
}

#[test]
fn watch_error_keeps_watcher_running_test() {
    let (mut processor, cache, sink) = processor();
    feed(&mut processor, vec![Event::Init, Event::InitApply(pod("a", "1")), Event::InitDone]);
    sink.take();

    assert_eq!(
        ProcessorResult::Continue,
        processor.process_event(Err(Error::NoResourceVersion))
    );
    assert_eq!(vec!["default/a"], cache.list_keys());
    assert!(sink.take().is_empty());
}
