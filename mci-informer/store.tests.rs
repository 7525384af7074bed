use std::collections::BTreeSet;

use super::*;
use crate::testing::{FakeCache, pod};

fn names(objects: &[SharedObject]) -> BTreeSet<String> {
    objects.iter().filter_map(|o| o.metadata.name.clone()).collect()
}

fn store() -> AggregatedStore {
    let mut store = AggregatedStore::new();
    store.register(
        ResourceKind::Pods,
        FakeCache::with(&[pod("default", "a1"), pod("default", "a2")]),
    );
    store.register(ResourceKind::Services, FakeCache::with(&[pod("default", "b1")]));
    store
}

#[test]
fn list_all_kinds_test() {
    let store = store();
    let all = store.list("all");

    assert_eq!(3, all.len());
    assert_eq!(BTreeSet::from(["a1".to_owned(), "a2".to_owned(), "b1".to_owned()]), names(&all));
}

#[test]
fn list_single_kind_test() {
    let store = store();

    assert_eq!(
        BTreeSet::from(["a1".to_owned(), "a2".to_owned()]),
        names(&store.list("pods"))
    );
    assert_eq!(BTreeSet::from(["b1".to_owned()]), names(&store.list(ResourceKind::Services)));
}

#[test]
fn list_keys_test() {
    let store = store();

    assert_eq!(vec!["default/a1", "default/a2"], store.list_keys("Pod"));
    assert_eq!(3, store.list_keys(KindSelector::All).len());
}

#[test]
fn unknown_kind_yields_empty_results_test() {
    let store = store();

    assert!(store.list("secrets").is_empty());
    assert!(store.list_keys("widgets").is_empty());

    let (found, exists) = store.get_by_key("widgets", "default/a1");
    assert!(!exists);
    assert!(found.is_empty());
}

#[test]
fn get_by_key_returns_every_match_test() {
    let mut store = AggregatedStore::new();
    store.register(ResourceKind::Pods, FakeCache::with(&[pod("default", "nginx")]));
    store.register(ResourceKind::Pods, FakeCache::with(&[pod("default", "nginx")]));
    store.register(ResourceKind::Services, FakeCache::with(&[pod("default", "nginx")]));

    let (found, exists) = store.get_by_key("pods", "default/nginx");
    assert!(exists);
    assert_eq!(2, found.len());

    let (found, exists) = store.get_by_key("all", "default/nginx");
    assert!(exists);
    assert_eq!(3, found.len());
}

#[test]
fn get_by_key_not_found_test() {
    let store = store();

    let (found, exists) = store.get_by_key("pods", "default/b1");
    assert!(!exists);
    assert!(found.is_empty());
}

#[test]
fn objects_are_not_deduplicated_across_sources_test() {
    let mut store = AggregatedStore::new();
    let shared = pod("default", "nginx");
    store.register(ResourceKind::Pods, FakeCache::with(&[Arc::clone(&shared)]));
    store.register(ResourceKind::Pods, FakeCache::with(&[shared]));

    assert_eq!(2, store.list("pods").len());
    assert_eq!(vec!["default/nginx", "default/nginx"], store.list_keys("pods"));
}

#[test]
fn has_synced_requires_every_cache_test() {
    let mut store = AggregatedStore::new();
    assert!(store.is_empty());
    assert!(store.has_synced());

    let pending = Arc::new(FakeCache::default());
    store.register(ResourceKind::Pods, FakeCache::with(&[]));
    store.register(ResourceKind::Pods, pending.clone());

    assert_eq!(2, store.len());
    assert_eq!(vec![&ResourceKind::Pods], store.kinds().collect::<Vec<_>>());
    assert!(!store.has_synced());

    pending.set_synced(true);
    assert!(store.has_synced());
}
