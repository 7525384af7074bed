use k8s_openapi::api::core::v1::Pod;
use kube::api::ApiResource;

use super::*;

fn pod(name: &str, namespace: Option<&str>) -> DynamicObject {
    let object = DynamicObject::new(name, &ApiResource::erase::<Pod>(&()));
    match namespace {
        Some(namespace) => object.within(namespace),
        None => object,
    }
}

#[test]
fn object_key_test() {
    assert_eq!(Some("default/nginx".to_owned()), object_key(&pod("nginx", Some("default"))));
    assert_eq!(Some("node-1".to_owned()), object_key(&pod("node-1", None)));
    assert_eq!(Some("node-1".to_owned()), object_key(&pod("node-1", Some(""))));
    assert_eq!(None, object_key(&pod("", Some("default"))));
}

#[test]
fn identity_distinguishes_sources_and_kinds_test() {
    let e1 = ChangeEvent::new("c1", EventKind::Add, ResourceKind::Pods, "default/x");
    let e2 = ChangeEvent::new("c2", EventKind::Add, ResourceKind::Pods, "default/x");
    let e3 = ChangeEvent::new("c1", EventKind::Add, ResourceKind::Services, "default/x");
    let e4 = ChangeEvent::new("c1", EventKind::Delete, ResourceKind::Pods, "default/x");

    assert_ne!(e1.identity(), e2.identity());
    assert_ne!(e1.identity(), e3.identity());
    assert_eq!(e1.identity(), e4.identity());
    assert_eq!("c1:pods:default/x", e1.identity().to_string());
}

#[test]
fn with_object_test() {
    let event = ChangeEvent::new("c1", EventKind::Update, ResourceKind::Pods, "default/x");
    assert!(event.object.is_none());

    let event = event.with_object(Arc::new(pod("x", Some("default"))));
    assert_eq!(Some("x"), event.object.as_ref().and_then(|o| o.metadata.name.as_deref()));
    assert_eq!("update", event.event.to_string());
}
