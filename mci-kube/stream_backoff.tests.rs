use futures::StreamExt;
use kube::api::DynamicObject;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::*;

struct TestBackoff {
    delay: Option<Duration>,
    resets: Arc<AtomicUsize>,
}

impl Iterator for TestBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        self.delay
    }
}

impl Backoff for TestBackoff {
    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }
}

fn events(items: Vec<Result<Event<DynamicObject>, WatcherError>>) -> impl Stream<Item = Result<Event<DynamicObject>, WatcherError>> {
    futures::stream::iter(items)
}

#[tokio::test(start_paused = true)]
async fn error_pauses_stream_test() {
    let resets = Arc::new(AtomicUsize::new(0));
    let backoff = TestBackoff {
        delay: Some(Duration::from_secs(2)),
        resets: Arc::clone(&resets),
    };
    let mut stream = StreamBackoff::new(
        events(vec![Err(WatcherError::NoResourceVersion), Ok(Event::Init), Ok(Event::InitDone)]),
        backoff,
    )
    .boxed();

    assert!(matches!(stream.next().await, Some(Err(_))));

    let start = Instant::now();
    assert!(matches!(stream.next().await, Some(Ok(Event::Init))));
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(0, resets.load(Ordering::Relaxed));

    assert!(matches!(stream.next().await, Some(Ok(Event::InitDone))));
    assert_eq!(1, resets.load(Ordering::Relaxed));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn stream_ends_when_backoff_gives_up_test() {
    let backoff = TestBackoff {
        delay: None,
        resets: Arc::new(AtomicUsize::new(0)),
    };
    let mut stream = StreamBackoff::new(
        events(vec![Err(WatcherError::NoResourceVersion), Ok(Event::InitDone)]),
        backoff,
    )
    .boxed();

    assert!(matches!(stream.next().await, Some(Err(_))));
    assert!(stream.next().await.is_none());
}
