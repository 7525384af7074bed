use kube::api::GroupVersionKind;
use rstest::rstest;

use super::*;

fn resource(group: &str, kind: &str, plural: &str, scope: Scope) -> (ApiResource, Scope) {
    let gvk = GroupVersionKind::gvk(group, "v1", kind);
    (ApiResource::from_gvk_with_plural(&gvk, plural), scope)
}

fn discovered() -> Vec<(ApiResource, Scope)> {
    vec![
        resource("events.k8s.io", "Event", "events", Scope::Namespaced),
        resource("", "Event", "events", Scope::Namespaced),
        resource("", "Node", "nodes", Scope::Cluster),
        resource("networking.k8s.io", "Ingress", "ingresses", Scope::Namespaced),
    ]
}

fn find(name: &str) -> Option<(ApiResource, Scope)> {
    let discovered = discovered();
    find_resource(discovered.iter().map(|(ar, scope)| (ar, scope)), name)
}

#[rstest]
#[case(ResourceKind::Pods, "", "v1", "Pod")]
#[case(ResourceKind::ConfigMaps, "", "v1", "ConfigMap")]
#[case(ResourceKind::Deployments, "apps", "v1", "Deployment")]
#[case(ResourceKind::Jobs, "batch", "v1", "Job")]
#[case(ResourceKind::Events, "", "v1", "Event")]
fn well_known_kinds_test(
    #[case] kind: ResourceKind,
    #[case] group: &str,
    #[case] version: &str,
    #[case] expected_kind: &str,
) {
    let registry = KindRegistry::default();
    let (ar, scope) = registry.resolve(&kind).unwrap();

    assert_eq!(group, ar.group);
    assert_eq!(version, ar.version);
    assert_eq!(expected_kind, ar.kind);
    assert_eq!(kind.as_str(), ar.plural);
    assert_eq!(&Scope::Namespaced, scope);
}

#[test]
fn unknown_kind_is_not_resolved_test() {
    let registry = KindRegistry::default();
    assert!(registry.resolve(&ResourceKind::Other("ingresses".to_owned())).is_none());
}

#[rstest]
#[case("nodes", Some(("", "Node")))]
#[case("Node", Some(("", "Node")))]
#[case("ingresses", Some(("networking.k8s.io", "Ingress")))]
#[case("events", Some(("", "Event")))]
#[case("widgets", None)]
fn find_resource_test(#[case] name: &str, #[case] expected: Option<(&str, &str)>) {
    let found = find(name);
    assert_eq!(
        expected,
        found.as_ref().map(|(ar, _)| (ar.group.as_str(), ar.kind.as_str()))
    );
}

#[test]
fn register_discovered_kind_test() {
    let mut registry = KindRegistry::default();
    let (ar, scope) = find("nodes").unwrap();
    registry.register(ResourceKind::Other("nodes".to_owned()), ar, scope);

    let (ar, scope) = registry.resolve(&ResourceKind::Other("nodes".to_owned())).unwrap();
    assert_eq!("Node", ar.kind);
    assert_eq!(&Scope::Cluster, scope);
}
