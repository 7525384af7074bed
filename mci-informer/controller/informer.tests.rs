use mci_config::{ClusterConfig, ClusterMetadata, ResourceConfig};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use super::*;
use crate::testing::{FakeProvider, pod, scope};
use crate::{EventKind, ResourceKind, WatchRequest};

fn settings(retry_ceiling: u32) -> InformerSettings {
    InformerSettings {
        retry_ceiling,
        rate_limit: RateLimit::None,
        sync_timeout: None,
    }
}

fn informer(providers: &[Arc<FakeProvider>], resources: Vec<ResourceSpec>) -> Arc<MultiClusterInformer> {
    informer_with(settings(3), providers, resources)
}

fn informer_with(
    settings: InformerSettings,
    providers: &[Arc<FakeProvider>],
    resources: Vec<ResourceSpec>,
) -> Arc<MultiClusterInformer> {
    let sources = providers
        .iter()
        .map(|p| SourceSpec::new(Arc::clone(p) as Arc<dyn WatchProvider>, resources.clone()))
        .collect();

    Arc::new(MultiClusterInformer::new(settings, sources))
}

fn spawn_run(informer: &Arc<MultiClusterInformer>) -> JoinHandle<Result<(), InformerError>> {
    let informer = Arc::clone(informer);
    tokio::spawn(async move { informer.run().await })
}

async fn wait_for_state(informer: &MultiClusterInformer, expected: InformerState) {
    for _ in 0..100 {
        if informer.state() == expected {
            return;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("informer did not reach {expected} state, it is {}", informer.state());
}

#[tokio::test(start_paused = true)]
async fn run_expands_all_namespaces_test() {
    let provider = Arc::new(FakeProvider::new("c1"));
    let informer = informer(
        &[Arc::clone(&provider)],
        vec![
            ResourceSpec::new("pods", "all", false),
            ResourceSpec::new("services", "default", false),
            ResourceSpec::new("pods", "default", true),
            ResourceSpec::new("nodes", "all", false),
        ],
    );

    let run = spawn_run(&informer);
    wait_for_state(&informer, InformerState::Running).await;

    assert_eq!(
        vec![
            WatchRequest::new(ResourceKind::Pods, scope("default")),
            WatchRequest::new(ResourceKind::Pods, scope("kube-system")),
            WatchRequest::new(ResourceKind::Services, scope("default")),
            WatchRequest::new(ResourceKind::Other("nodes".to_owned()), scope("all")),
        ],
        provider.requests()
    );
    assert_eq!(4, provider.running.load(AtomicOrdering::SeqCst));

    informer.stop().unwrap();
    run.await.unwrap().unwrap();

    assert_eq!(InformerState::Stopped, informer.state());
    assert_eq!(0, provider.running.load(AtomicOrdering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn run_waits_for_every_watcher_to_sync_test() {
    let provider = Arc::new(FakeProvider::new("c1").never_syncing());
    let informer = informer(&[Arc::clone(&provider)], vec![ResourceSpec::new("pods", "all", false)]);

    let run = spawn_run(&informer);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(InformerState::Starting, informer.state());

    provider.cache(0).set_synced(true);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(InformerState::Starting, informer.state());

    provider.sync_all();
    wait_for_state(&informer, InformerState::Running).await;

    informer.stop().unwrap();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn stop_during_sync_aborts_startup_test() {
    let provider = Arc::new(FakeProvider::new("c1").never_syncing());
    let informer = informer(&[Arc::clone(&provider)], vec![ResourceSpec::new("pods", "default", false)]);

    let run = spawn_run(&informer);
    wait_for_state(&informer, InformerState::Starting).await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    informer.stop().unwrap();

    assert!(matches!(run.await.unwrap(), Err(InformerError::SyncAborted)));
    assert_eq!(InformerState::Stopped, informer.state());
    assert_eq!(0, provider.running.load(AtomicOrdering::SeqCst));
    assert_eq!(Err(FunnelError::Closed), informer.pop().await.map(|_| ()));
}

#[tokio::test(start_paused = true)]
async fn sync_timeout_aborts_startup_test() {
    let provider = Arc::new(FakeProvider::new("c1").never_syncing());
    let settings = InformerSettings {
        sync_timeout: Some(Duration::from_secs(30)),
        ..settings(3)
    };
    let informer = informer_with(settings, &[Arc::clone(&provider)], vec![ResourceSpec::new("pods", "default", false)]);

    let result = informer.run().await;

    assert!(matches!(result, Err(InformerError::SyncTimeout(timeout)) if timeout == Duration::from_secs(30)));
    assert_eq!(InformerState::Stopped, informer.state());
    assert_eq!(0, provider.running.load(AtomicOrdering::SeqCst));
    assert!(matches!(informer.stop(), Err(InformerError::AlreadyStopped)));
}

#[tokio::test(start_paused = true)]
async fn namespace_enumeration_failure_is_fatal_test() {
    let provider = Arc::new(FakeProvider::new("c1").without_namespaces());
    let informer = informer(&[Arc::clone(&provider)], vec![ResourceSpec::new("pods", "all", false)]);

    let result = informer.run().await;

    assert!(matches!(result, Err(InformerError::Setup(_))));
    assert!(provider.requests().is_empty());
    assert_eq!(InformerState::Stopped, informer.state());
}

#[tokio::test(start_paused = true)]
async fn watch_start_failure_is_fatal_test() {
    let good = Arc::new(FakeProvider::new("c1"));
    let bad = Arc::new(FakeProvider::new("c2").rejecting(ResourceKind::Services));
    let informer = informer(
        &[Arc::clone(&good), Arc::clone(&bad)],
        vec![
            ResourceSpec::new("pods", "default", false),
            ResourceSpec::new("services", "default", false),
        ],
    );

    let result = informer.run().await;

    assert!(matches!(
        result,
        Err(InformerError::Setup(ProviderError::UnsupportedKind { ref cluster, .. })) if cluster == "c2"
    ));
    assert_eq!(0, good.running.load(AtomicOrdering::SeqCst));
    assert_eq!(InformerState::Stopped, informer.state());
}

#[tokio::test(start_paused = true)]
async fn stop_only_once_test() {
    let provider = Arc::new(FakeProvider::new("c1"));
    let informer = informer(&[Arc::clone(&provider)], vec![ResourceSpec::new("pods", "default", false)]);

    let run = spawn_run(&informer);
    wait_for_state(&informer, InformerState::Running).await;
    assert!(matches!(informer.run().await, Err(InformerError::AlreadyStarted)));

    assert!(informer.stop().is_ok());
    assert!(matches!(informer.stop(), Err(InformerError::AlreadyStopped)));
    assert!(run.await.unwrap().is_ok());
    assert!(matches!(informer.stop(), Err(InformerError::AlreadyStopped)));
}

#[tokio::test]
async fn stop_before_run_test() {
    let provider = Arc::new(FakeProvider::new("c1"));
    let informer = informer(&[Arc::clone(&provider)], vec![ResourceSpec::new("pods", "default", false)]);

    assert!(informer.stop().is_ok());
    assert_eq!(InformerState::Stopped, informer.state());
    assert!(matches!(informer.run().await, Err(InformerError::AlreadyStopped)));
    assert!(provider.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn same_key_in_two_clusters_test() {
    let c1 = Arc::new(FakeProvider::new("c1"));
    let c2 = Arc::new(FakeProvider::new("c2"));
    let informer = informer(
        &[Arc::clone(&c1), Arc::clone(&c2)],
        vec![ResourceSpec::new("pods", "default", false)],
    );

    assert_eq!((0, false), {
        let (found, exists) = informer.get_by_key("pods", "default/nginx");
        (found.len(), exists)
    });

    let run = spawn_run(&informer);
    wait_for_state(&informer, InformerState::Running).await;

    c1.cache(0).insert(pod("default", "nginx"));
    c2.cache(0).insert(pod("default", "nginx"));
    c2.cache(0).insert(pod("default", "redis"));

    let (found, exists) = informer.get_by_key("pods", "default/nginx");
    assert!(exists);
    assert_eq!(2, found.len());

    let (found, exists) = informer.get_by_key("services", "default/nginx");
    assert!(!exists);
    assert!(found.is_empty());

    assert_eq!(3, informer.list("all").len());
    assert_eq!(vec!["default/nginx", "default/nginx", "default/redis"], informer.list_keys("pods"));

    informer.stop().unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn events_flow_to_handler_test() {
    let provider = Arc::new(FakeProvider::new("c1"));
    let informer = informer(
        &[Arc::clone(&provider)],
        vec![
            ResourceSpec::new("pods", "default", true),
            ResourceSpec::new("services", "default", false),
        ],
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&seen);
    informer.add_event_handler(move |event| {
        captured
            .lock()
            .unwrap()
            .push((event.identity().to_string(), event.event, event.object.is_some()));
        Ok(())
    });

    let run = spawn_run(&informer);
    wait_for_state(&informer, InformerState::Running).await;

    provider.sink(0).on_add(pod("default", "nginx"));
    provider.sink(0).on_update(pod("default", "nginx"), pod("default", "nginx"));
    provider.sink(1).on_delete(pod("default", "web"));
    provider.sink(1).on_add(pod("default", ""));

    assert_eq!(Ok(ProcessOutcome::Finished), informer.process_next().await);
    assert_eq!(Ok(ProcessOutcome::Finished), informer.process_next().await);
    assert_eq!(0, informer.stats().queued);

    informer.stop().unwrap();
    run.await.unwrap().unwrap();

    assert_eq!(Err(FunnelError::Closed), informer.process_next().await);
    assert_eq!(
        vec![
            ("c1:pods:default/nginx".to_owned(), EventKind::Update, true),
            ("c1:services:default/web".to_owned(), EventKind::Delete, false),
        ],
        *seen.lock().unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn failing_handler_requeues_until_dropped_test() {
    let provider = Arc::new(FakeProvider::new("c1"));
    let informer = informer_with(
        settings(1),
        &[Arc::clone(&provider)],
        vec![ResourceSpec::new("pods", "default", false)],
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    informer.add_event_handler(move |_| {
        counter.fetch_add(1, AtomicOrdering::Relaxed);
        anyhow::bail!("boom")
    });

    let run = spawn_run(&informer);
    wait_for_state(&informer, InformerState::Running).await;

    provider.sink(0).on_add(pod("default", "nginx"));

    assert_eq!(Ok(ProcessOutcome::Requeued), informer.process_next().await);
    assert_eq!(Ok(ProcessOutcome::Dropped), informer.process_next().await);
    assert_eq!(2, calls.load(AtomicOrdering::Relaxed));
    assert_eq!(1, informer.stats().dropped);

    informer.stop().unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn handle_object_without_handler_test() {
    let informer = informer(&[], Vec::new());
    let event = ChangeEvent::new("c1", EventKind::Add, ResourceKind::Pods, "default/x");

    assert!(informer.handle_object(&event).is_ok());

    informer.add_event_handler(|_| anyhow::bail!("nope"));
    assert!(informer.handle_object(&event).is_err());
}

#[test]
fn from_config_requires_provider_for_every_cluster_test() {
    let cluster = |name: &str| ClusterConfig {
        metadata: ClusterMetadata {
            cluster_name: name.to_owned(),
            config_path: None,
            context: None,
            insecure: false,
            list: vec![ResourceConfig {
                kind: "pods".to_owned(),
                namespace: "all".to_owned(),
                retain_objects: false,
            }],
        },
    };
    let config = Config {
        max_requeue_time: 7,
        clusters: vec![cluster("c1"), cluster("c2")],
        ..Default::default()
    };

    let providers: Vec<Arc<dyn WatchProvider>> = vec![Arc::new(FakeProvider::new("c1"))];
    let result = MultiClusterInformer::from_config(&config, providers);
    assert!(matches!(result, Err(InformerError::MissingSource(name)) if name == "c2"));

    let providers: Vec<Arc<dyn WatchProvider>> =
        vec![Arc::new(FakeProvider::new("c2")), Arc::new(FakeProvider::new("c1"))];
    let informer = MultiClusterInformer::from_config(&config, providers).unwrap();
    assert_eq!(InformerState::Constructed, informer.state());
    assert_eq!(7, informer.funnel.retry_ceiling());
    assert_eq!(vec!["c1", "c2"], informer.sources.iter().map(SourceSpec::name).collect::<Vec<_>>());
}
