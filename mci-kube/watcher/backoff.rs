use kube::runtime::utils::Backoff;
use mci_common::ResettableBackoff;
use std::time::Duration;

/// Watch stream backoff policy, it never gives up.
#[derive(Default)]
pub struct WatchBackoff(ResettableBackoff);

impl Iterator for WatchBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_backoff()
    }
}

impl Backoff for WatchBackoff {
    fn reset(&mut self) {
        self.0.reset();
    }
}
