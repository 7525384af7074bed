use futures::{StreamExt, TryStreamExt};
use kube::Api;
use kube::api::DynamicObject;
use kube::runtime::watcher::{self, watcher};
use mci_common::ResettableBackoff;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::stream_backoff::StreamBackoff;
use crate::watcher::EventsProcessor;
use crate::watcher::backoff::WatchBackoff;
use crate::watcher::processor::ProcessorResult;

/// Runs the watch loop until `cancellation_token` is cancelled.\
/// The watcher is recreated whenever its stream ends or keeps failing to start.
pub async fn watch(api: Api<DynamicObject>, mut processor: EventsProcessor, cancellation_token: CancellationToken) {
    let mut restart_backoff = ResettableBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
    let mut is_restart = false;

    while !cancellation_token.is_cancelled() {
        if is_restart {
            let delay = restart_backoff.next_backoff().unwrap_or(Duration::from_secs(1));
            tokio::select! {
                () = cancellation_token.cancelled() => return,
                () = tokio::time::sleep(delay) => (),
            }
        }

        is_restart = true;
        let mut watch = StreamBackoff::new(watcher(api.clone(), watcher::Config::default()), WatchBackoff::default()).boxed();

        while !cancellation_token.is_cancelled() {
            tokio::select! {
                () = cancellation_token.cancelled() => (),
                result = watch.try_next() => {
                    if processor.process_event(result) == ProcessorResult::Restart {
                        break; // recreate the watcher in the outer loop
                    }
                },
            }
        }
    }
}
