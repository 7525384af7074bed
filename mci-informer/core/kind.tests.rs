use rstest::rstest;

use super::*;

#[rstest]
#[case("pods", ResourceKind::Pods)]
#[case("Pod", ResourceKind::Pods)]
#[case("PODS", ResourceKind::Pods)]
#[case(" services ", ResourceKind::Services)]
#[case("configmaps", ResourceKind::ConfigMaps)]
#[case("ConfigMap", ResourceKind::ConfigMaps)]
#[case("statefulsets", ResourceKind::StatefulSets)]
#[case("DaemonSet", ResourceKind::DaemonSets)]
#[case("events", ResourceKind::Events)]
#[case("Ingresses", ResourceKind::Other("ingresses".to_owned()))]
fn kind_from_str_test(#[case] input: &str, #[case] expected: ResourceKind) {
    assert_eq!(expected, ResourceKind::from(input));
}

#[test]
fn kind_display_test() {
    assert_eq!("deployments", ResourceKind::Deployments.to_string());
    assert_eq!("leases", ResourceKind::from("leases").to_string());
}

#[test]
fn known_kinds_round_trip_test() {
    for kind in ResourceKind::KNOWN {
        assert!(!matches!(kind, ResourceKind::Other(_)));
        assert_eq!(kind, ResourceKind::from(kind.as_str()));
    }
}

#[rstest]
#[case("all", KindSelector::All)]
#[case("ALL", KindSelector::All)]
#[case("pods", KindSelector::Only(ResourceKind::Pods))]
#[case("unknown", KindSelector::Only(ResourceKind::Other("unknown".to_owned())))]
fn selector_from_str_test(#[case] input: &str, #[case] expected: KindSelector) {
    assert_eq!(expected, KindSelector::from(input));
}

#[test]
fn selector_matches_test() {
    assert!(KindSelector::All.matches(&ResourceKind::Secrets));
    assert!(KindSelector::from("secrets").matches(&ResourceKind::Secrets));
    assert!(!KindSelector::from("pods").matches(&ResourceKind::Secrets));
}
