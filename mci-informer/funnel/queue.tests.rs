use k8s_openapi::api::core::v1::Pod;
use kube::api::{ApiResource, DynamicObject};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::*;
use crate::{EventKind, ResourceKind};

fn event(key: &str, kind: EventKind) -> ChangeEvent {
    ChangeEvent::new("c1", kind, ResourceKind::Pods, key)
}

fn versioned_event(key: &str, version: u32) -> ChangeEvent {
    let mut object = DynamicObject::new(key, &ApiResource::erase::<Pod>(&())).within("default");
    object.metadata.resource_version = Some(version.to_string());
    event(key, EventKind::Update).with_object(Arc::new(object))
}

fn version_of(item: &FunnelItem) -> u32 {
    item.object
        .as_ref()
        .and_then(|o| o.metadata.resource_version.as_deref())
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn funnel(retry_ceiling: u32) -> EventFunnel {
    EventFunnel::new(retry_ceiling, RateLimit::None)
}

async fn assert_nothing_to_pop(funnel: &EventFunnel) {
    assert!(timeout(Duration::from_millis(50), funnel.pop()).await.is_err());
}

#[tokio::test]
async fn push_pop_finish_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();

    let item = funnel.pop().await.unwrap();
    assert_eq!("default/x", item.key);
    assert_eq!(EventKind::Add, item.event.event);
    assert_eq!(0, item.retries());
    assert_eq!(1, funnel.stats().in_flight);

    funnel.finish(&item).unwrap();
    assert_eq!(FunnelStats::default(), funnel.stats());
}

#[tokio::test(start_paused = true)]
async fn pending_identity_is_coalesced_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    funnel.push(event("default/x", EventKind::Update)).unwrap();
    funnel.push(event("default/x", EventKind::Delete)).unwrap();

    assert_eq!(1, funnel.len());

    let item = funnel.pop().await.unwrap();
    assert_eq!(EventKind::Delete, item.event.event);
    funnel.finish(&item).unwrap();

    assert_nothing_to_pop(&funnel).await;
}

#[tokio::test]
async fn different_sources_and_kinds_do_not_collide_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    funnel
        .push(ChangeEvent::new("c2", EventKind::Add, ResourceKind::Pods, "default/x"))
        .unwrap();
    funnel
        .push(ChangeEvent::new("c1", EventKind::Add, ResourceKind::Services, "default/x"))
        .unwrap();

    assert_eq!(3, funnel.len());
}

#[tokio::test]
async fn coalesced_identity_keeps_its_position_test() {
    let funnel = funnel(3);
    funnel.push(event("default/a", EventKind::Add)).unwrap();
    funnel.push(event("default/b", EventKind::Add)).unwrap();
    funnel.push(event("default/a", EventKind::Update)).unwrap();

    let first = funnel.pop().await.unwrap();
    let second = funnel.pop().await.unwrap();

    assert_eq!("default/a", first.key);
    assert_eq!(EventKind::Update, first.event.event);
    assert_eq!("default/b", second.key);
}

#[tokio::test(start_paused = true)]
async fn identity_is_never_in_flight_twice_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let first = funnel.pop().await.unwrap();

    funnel.push(event("default/x", EventKind::Update)).unwrap();
    assert_eq!(0, funnel.stats().queued);
    assert_nothing_to_pop(&funnel).await;

    funnel.finish(&first).unwrap();

    let second = funnel.pop().await.unwrap();
    assert_eq!(EventKind::Update, second.event.event);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_is_exhausted_after_ceiling_test() {
    let funnel = funnel(2);
    funnel.push(event("default/x", EventKind::Add)).unwrap();

    let item = funnel.pop().await.unwrap();
    assert_eq!(Ok(()), funnel.requeue(&item));

    let item = funnel.pop().await.unwrap();
    assert_eq!(1, item.retries());
    assert_eq!(Ok(()), funnel.requeue(&item));

    let item = funnel.pop().await.unwrap();
    assert_eq!(2, item.retries());
    assert_eq!(
        Err(FunnelError::RetryBudgetExhausted {
            identity: item.identity().clone(),
            retries: 2,
        }),
        funnel.requeue(&item)
    );

    assert_nothing_to_pop(&funnel).await;
    assert_eq!(0, funnel.num_requeues(item.identity()));
    assert_eq!(1, funnel.stats().dropped);
    assert_eq!(0, funnel.stats().in_flight);
}

#[tokio::test]
async fn zero_ceiling_drops_on_first_requeue_test() {
    let funnel = funnel(0);
    funnel.push(event("default/x", EventKind::Add)).unwrap();

    let item = funnel.pop().await.unwrap();

    assert!(matches!(
        funnel.requeue(&item),
        Err(FunnelError::RetryBudgetExhausted { retries: 0, .. })
    ));
}

#[tokio::test]
async fn finish_resets_retry_count_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();

    for _ in 0..2 {
        let item = funnel.pop().await.unwrap();
        funnel.requeue(&item).unwrap();
    }

    let item = funnel.pop().await.unwrap();
    assert_eq!(2, item.retries());
    funnel.finish(&item).unwrap();
    assert_eq!(0, funnel.num_requeues(item.identity()));

    funnel.push(event("default/x", EventKind::Update)).unwrap();
    for expected_retries in 0..3 {
        let item = funnel.pop().await.unwrap();
        assert_eq!(expected_retries, item.retries());
        assert_eq!(Ok(()), funnel.requeue(&item));
    }

    let item = funnel.pop().await.unwrap();
    assert!(matches!(
        funnel.requeue(&item),
        Err(FunnelError::RetryBudgetExhausted { retries: 3, .. })
    ));
}

#[tokio::test]
async fn retry_ceiling_can_be_changed_test() {
    let funnel = funnel(5);
    funnel.push(event("default/x", EventKind::Add)).unwrap();

    let item = funnel.pop().await.unwrap();
    funnel.requeue(&item).unwrap();

    funnel.set_retry_ceiling(1);
    assert_eq!(1, funnel.retry_ceiling());

    let item = funnel.pop().await.unwrap();
    assert!(matches!(
        funnel.requeue(&item),
        Err(FunnelError::RetryBudgetExhausted { .. })
    ));
}

#[tokio::test]
async fn newer_push_supersedes_requeued_payload_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let item = funnel.pop().await.unwrap();

    funnel.push(event("default/x", EventKind::Delete)).unwrap();
    funnel.requeue(&item).unwrap();

    let item = funnel.pop().await.unwrap();
    assert_eq!(EventKind::Delete, item.event.event);
    assert_eq!(1, item.retries());
    assert_eq!(0, funnel.len());
}

#[tokio::test]
async fn requeue_of_unknown_item_fails_test() {
    let funnel = funnel(3);
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let item = funnel.pop().await.unwrap();
    funnel.finish(&item).unwrap();

    assert_eq!(
        Err(FunnelError::NotInFlight(item.identity().clone())),
        funnel.requeue(&item)
    );
}

#[tokio::test]
async fn finish_of_requeued_item_keeps_retry_count_test() {
    let funnel = funnel(1);
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let stale = funnel.pop().await.unwrap();
    funnel.requeue(&stale).unwrap();

    assert_eq!(
        Err(FunnelError::NotInFlight(stale.identity().clone())),
        funnel.finish(&stale)
    );
    assert_eq!(1, funnel.num_requeues(stale.identity()));

    let item = funnel.pop().await.unwrap();
    assert!(matches!(
        funnel.requeue(&item),
        Err(FunnelError::RetryBudgetExhausted { retries: 1, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn close_waits_for_payload_behind_in_flight_item_test() {
    let funnel = Arc::new(funnel(3));
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let first = funnel.pop().await.unwrap();
    funnel.push(event("default/x", EventKind::Update)).unwrap();
    funnel.close();

    assert_nothing_to_pop(&funnel).await;

    let waiting = tokio::spawn({
        let funnel = Arc::clone(&funnel);
        async move { funnel.pop().await }
    });
    tokio::task::yield_now().await;
    funnel.finish(&first).unwrap();

    let second = waiting.await.unwrap().unwrap();
    assert_eq!(EventKind::Update, second.event.event);
    funnel.finish(&second).unwrap();
    assert_eq!(Err(FunnelError::Closed), funnel.pop().await.map(|_| ()));
}

#[tokio::test(start_paused = true)]
async fn dropped_item_releases_payload_waiting_behind_it_test() {
    let funnel = Arc::new(funnel(0));
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let first = funnel.pop().await.unwrap();
    funnel.push(event("default/x", EventKind::Delete)).unwrap();
    funnel.close();

    let waiting = tokio::spawn({
        let funnel = Arc::clone(&funnel);
        async move { funnel.pop().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(Err(FunnelError::Closed), funnel.requeue(&first));

    let second = waiting.await.unwrap().unwrap();
    assert_eq!(EventKind::Delete, second.event.event);
}

#[tokio::test]
async fn close_unblocks_waiting_pop_test() {
    let funnel = Arc::new(funnel(3));
    let waiting = tokio::spawn({
        let funnel = Arc::clone(&funnel);
        async move { funnel.pop().await }
    });

    tokio::task::yield_now().await;
    funnel.close();

    assert_eq!(Err(FunnelError::Closed), waiting.await.unwrap().map(|_| ()));
}

#[tokio::test]
async fn close_drains_pending_items_first_test() {
    let funnel = funnel(3);
    funnel.push(event("default/a", EventKind::Add)).unwrap();
    funnel.push(event("default/b", EventKind::Add)).unwrap();

    funnel.close();
    assert!(funnel.is_closed());
    assert_eq!(Err(FunnelError::Closed), funnel.push(event("default/c", EventKind::Add)));

    let a = funnel.pop().await.unwrap();
    let b = funnel.pop().await.unwrap();
    assert_eq!("default/a", a.key);
    assert_eq!("default/b", b.key);
    assert_eq!(Err(FunnelError::Closed), funnel.requeue(&a));
    funnel.finish(&b).unwrap();

    assert_eq!(Err(FunnelError::Closed), funnel.pop().await.map(|_| ()));
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_delays_admission_test() {
    let funnel = EventFunnel::new(3, RateLimit::Fixed(Duration::from_millis(100)));
    let start = Instant::now();
    funnel.push(event("default/x", EventKind::Add)).unwrap();

    assert_eq!(1, funnel.stats().delayed);
    assert!(timeout(Duration::from_millis(50), funnel.pop()).await.is_err());

    let item = funnel.pop().await.unwrap();
    assert_eq!("default/x", item.key);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn requeue_is_backed_off_exponentially_test() {
    let funnel = EventFunnel::new(
        5,
        RateLimit::Exponential {
            base: Duration::from_millis(10),
            max: Duration::from_secs(1),
        },
    );
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let mut item = funnel.pop().await.unwrap();

    for expected_delay in [10, 20, 40] {
        funnel.requeue(&item).unwrap();
        let start = Instant::now();
        item = funnel.pop().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(expected_delay));
    }

    assert_eq!(3, item.retries());
}

#[tokio::test(start_paused = true)]
async fn close_flushes_delayed_items_test() {
    let funnel = EventFunnel::new(3, RateLimit::Fixed(Duration::from_secs(3_600)));
    funnel.push(event("default/x", EventKind::Add)).unwrap();
    let start = Instant::now();

    funnel.close();

    let item = funnel.pop().await.unwrap();
    assert_eq!("default/x", item.key);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(Err(FunnelError::Closed), funnel.pop().await.map(|_| ()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn latest_payload_is_observed_for_every_identity_test() {
    const KEYS: usize = 10;
    const VERSIONS: u32 = 50;

    let funnel = Arc::new(funnel(3));
    let producers = (0..KEYS)
        .map(|i| {
            let funnel = Arc::clone(&funnel);
            tokio::spawn(async move {
                for version in 1..=VERSIONS {
                    funnel.push(versioned_event(&format!("pod-{i}"), version)).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect::<Vec<_>>();

    let consumer = tokio::spawn({
        let funnel = Arc::clone(&funnel);
        async move {
            let mut observed: HashMap<String, Vec<u32>> = HashMap::new();
            while let Ok(item) = funnel.pop().await {
                observed.entry(item.key.clone()).or_default().push(version_of(&item));
                funnel.finish(&item).unwrap();
            }

            observed
        }
    });

    for producer in producers {
        producer.await.unwrap();
    }

    funnel.close();
    let observed = consumer.await.unwrap();

    assert_eq!(KEYS, observed.len());
    for versions in observed.values() {
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Some(&VERSIONS), versions.last());
    }
}
