use rstest::rstest;
use std::path::PathBuf;

use super::*;

const FULL_CONFIG: &str = r#"
maxRequeueTime: 3
syncTimeoutSecs: 60
rateLimit:
  type: fixed
  delayMs: 20
clusters:
  - metadata:
      clusterName: cluster1
      configPath: /etc/kube/cluster1.yaml
      insecure: true
      list:
        - rType: pods
          namespace: default
          objSave: true
        - rType: deployments
          namespace: all
  - metadata:
      clusterName: cluster2
      context: kind-cluster2
      list:
        - rType: services
"#;

#[test]
fn parse_full_config_test() {
    let config = Config::from_yaml(FULL_CONFIG).unwrap();

    assert_eq!(3, config.max_requeue_time);
    assert_eq!(Some(60), config.sync_timeout_secs);
    assert_eq!(RateLimitConfig::Fixed { delay_ms: 20 }, config.rate_limit);
    assert_eq!(2, config.clusters.len());

    let cluster1 = &config.clusters[0];
    assert_eq!("cluster1", cluster1.name());
    assert_eq!(Some("/etc/kube/cluster1.yaml"), cluster1.metadata.config_path.as_deref());
    assert!(cluster1.metadata.insecure);
    assert_eq!(
        ResourceConfig {
            kind: "pods".to_owned(),
            namespace: "default".to_owned(),
            retain_objects: true,
        },
        cluster1.resources()[0]
    );
    assert_eq!(ALL_NAMESPACES, cluster1.resources()[1].namespace);
    assert!(!cluster1.resources()[1].retain_objects);

    let cluster2 = &config.clusters[1];
    assert_eq!(Some("kind-cluster2"), cluster2.metadata.context.as_deref());
    assert_eq!(None, cluster2.metadata.config_path);
    assert_eq!(ALL_NAMESPACES, cluster2.resources()[0].namespace);
}

#[test]
fn defaults_test() {
    let config = Config::from_yaml(
        r#"
clusters:
  - metadata:
      clusterName: c1
      list:
        - rType: pods
"#,
    )
    .unwrap();

    assert_eq!(0, config.max_requeue_time);
    assert_eq!(None, config.sync_timeout_secs);
    assert_eq!(
        RateLimitConfig::Exponential {
            base_delay_ms: 5,
            max_delay_ms: 1_000_000,
        },
        config.rate_limit
    );
}

#[rstest]
#[case("type: none", RateLimitConfig::None)]
#[case("type: fixed\n  delayMs: 7", RateLimitConfig::Fixed { delay_ms: 7 })]
#[case("type: exponential\n  baseDelayMs: 10", RateLimitConfig::Exponential { base_delay_ms: 10, max_delay_ms: 1_000_000 })]
fn parse_rate_limit_test(#[case] rate_limit: &str, #[case] expected: RateLimitConfig) {
    let yaml = format!(
        "rateLimit:\n  {rate_limit}\nclusters:\n  - metadata:\n      clusterName: c1\n      list:\n        - rType: pods\n"
    );

    assert_eq!(expected, Config::from_yaml(&yaml).unwrap().rate_limit);
}

#[rstest]
#[case("clusters: []")]
#[case("clusters:\n  - metadata:\n      clusterName: ''\n      list:\n        - rType: pods")]
#[case("clusters:\n  - metadata:\n      clusterName: c1\n      list: []")]
#[case("clusters:\n  - metadata:\n      clusterName: c1\n      list:\n        - rType: all")]
#[case("clusters:\n  - metadata:\n      clusterName: c1\n      list:\n        - rType: ' '")]
#[case(
    "clusters:\n  - metadata:\n      clusterName: c1\n      list:\n        - rType: pods\n  - metadata:\n      clusterName: c1\n      list:\n        - rType: pods"
)]
fn invalid_config_test(#[case] yaml: &str) {
    assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Invalid(_))));
}

#[test]
fn malformed_yaml_test() {
    assert!(matches!(
        Config::from_yaml("clusters: [ {"),
        Err(ConfigError::SerializationError(_))
    ));
}

#[tokio::test]
async fn load_missing_file_test() {
    let path = PathBuf::from("/this/path/does/not/exist/config.yaml");

    assert!(matches!(Config::load(&path).await, Err(ConfigError::IoError(_))));
}

#[tokio::test]
async fn load_from_file_test() {
    let path = std::env::temp_dir().join(format!("mci-config-test-{}.yaml", std::process::id()));
    tokio::fs::write(&path, FULL_CONFIG).await.unwrap();

    let config = Config::load(&path).await;
    let _ = tokio::fs::remove_file(&path).await;

    assert_eq!(2, config.unwrap().clusters.len());
}
