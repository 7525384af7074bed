use kube::api::DynamicObject;
use kube::runtime::watcher::{Error, Event};
use mci_informer::{EventSink, SharedObject, WatchRequest, object_key};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::watcher::{ObjectCache, utils};

#[cfg(test)]
#[path = "./processor.tests.rs"]
mod processor_tests;

const WATCH_ERROR_TIMEOUT_SECS: u64 = 120;

/// Watcher's events processor result.
#[derive(Debug, PartialEq)]
pub enum ProcessorResult {
    Continue,
    Restart,
}

/// Folds watch events into the [`ObjectCache`] and reports every change to the [`EventSink`].
pub struct EventsProcessor {
    source: String,
    request: WatchRequest,
    cache: Arc<ObjectCache>,
    sink: Arc<dyn EventSink>,
    listing: Option<BTreeMap<String, SharedObject>>,
    last_watch_error: Option<Instant>,
}

impl EventsProcessor {
    /// Creates new [`EventsProcessor`] instance.
    pub fn new(source: String, request: WatchRequest, cache: Arc<ObjectCache>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            source,
            request,
            cache,
            sink,
            listing: None,
            last_watch_error: None,
        }
    }

    /// Process event received from the kubernetes resource watcher.
    pub fn process_event(&mut self, result: Result<Option<Event<DynamicObject>>, Error>) -> ProcessorResult {
        let event = match result {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(source = %self.source, kind = %self.request.kind, "Watch stream ended");
                return ProcessorResult::Restart;
            },
            Err(error) => return self.process_error(error),
        };

        // Init is also emitted after a watch error, so it does not prove the watch is healthy
        if !matches!(event, Event::Init) {
            self.last_watch_error = None;
        }

        match event {
            Event::Init => self.listing = Some(BTreeMap::new()),
            Event::InitApply(object) => {
                if let Some(key) = self.key_of(&object)
                    && let Some(listing) = self.listing.as_mut()
                {
                    listing.insert(key, Arc::new(object));
                }
            },
            Event::InitDone => {
                let listing = self.listing.take().unwrap_or_default();
                self.relist(listing);
            },
            Event::Apply(object) => {
                if let Some(key) = self.key_of(&object) {
                    let object = Arc::new(object);
                    match self.cache.upsert(key, Arc::clone(&object)) {
                        Some(old) => self.sink.on_update(old, object),
                        None => self.sink.on_add(object),
                    }
                }
            },
            Event::Delete(object) => {
                if let Some(key) = self.key_of(&object) {
                    self.cache.remove(&key);
                    self.sink.on_delete(Arc::new(object));
                }
            },
        }

        ProcessorResult::Continue
    }

    /// Swaps the cache content with a fresh listing and reports the difference.
    fn relist(&self, listing: BTreeMap<String, SharedObject>) {
        let mut added = Vec::new();
        let mut updated = Vec::new();
        let previous = self.cache.replace(listing.clone());
        let deleted = previous
            .iter()
            .filter(|(key, _)| !listing.contains_key(*key))
            .map(|(_, object)| Arc::clone(object))
            .collect::<Vec<_>>();

        for (key, object) in listing {
            match previous.get(&key) {
                None => added.push(object),
                Some(old) if old.metadata.resource_version != object.metadata.resource_version => {
                    updated.push((Arc::clone(old), object));
                },
                Some(_) => (),
            }
        }

        if self.cache.mark_synced() {
            tracing::info!(
                source = %self.source,
                kind = %self.request.kind,
                namespace = %self.request.namespace,
                objects = added.len(),
                "Initial listing completed"
            );
        } else {
            tracing::debug!(
                source = %self.source,
                kind = %self.request.kind,
                added = added.len(),
                updated = updated.len(),
                deleted = deleted.len(),
                "Relist completed"
            );
        }

        for object in added {
            self.sink.on_add(object);
        }

        for (old, new) in updated {
            self.sink.on_update(old, new);
        }

        for object in deleted {
            self.sink.on_delete(object);
        }
    }

    fn process_error(&mut self, error: Error) -> ProcessorResult {
        let is_forbidden = utils::is_api_error(&error, true);
        tracing::warn!(
            source = %self.source,
            kind = %self.request.kind,
            namespace = %self.request.namespace,
            forbidden = is_forbidden,
            "Watch error: {error}"
        );

        if let Error::WatchStartFailed(_) | Error::WatchFailed(_) = error {
            // these errors do not trigger relist, so the watcher is restarted if they keep coming
            if self
                .last_watch_error
                .is_some_and(|t| t.elapsed().as_secs() <= WATCH_ERROR_TIMEOUT_SECS)
            {
                tracing::warn!(source = %self.source, kind = %self.request.kind, "Forcefully restarting watcher");
                self.last_watch_error = Some(Instant::now());
                return ProcessorResult::Restart;
            }

            self.last_watch_error = Some(Instant::now());
        }

        ProcessorResult::Continue
    }

    fn key_of(&self, object: &DynamicObject) -> Option<String> {
        let key = object_key(object);
        if key.is_none() {
            tracing::warn!(source = %self.source, kind = %self.request.kind, "Object without a name, skipped");
        }

        key
    }
}
