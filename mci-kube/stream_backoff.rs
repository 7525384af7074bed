use futures::{Stream, TryStream};
use kube::runtime::utils::Backoff;
use kube::runtime::watcher::{Error as WatcherError, Event};
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::time::{Sleep, sleep};

#[cfg(test)]
#[path = "./stream_backoff.tests.rs"]
mod stream_backoff_tests;

/// Pauses the watch stream for the duration returned by [`Backoff`] after every error.
///
/// The backoff is reset by every successful event except [`Event::Init`], because the watcher emits `Init`
/// also right after an error (when it starts to relist). The stream ends when the backoff gives up.
#[pin_project]
pub struct StreamBackoff<S, B> {
    #[pin]
    stream: S,
    backoff: B,
    delay: Option<Pin<Box<Sleep>>>,
    given_up: bool,
}

impl<S, B> StreamBackoff<S, B> {
    /// Creates new [`StreamBackoff`] instance.
    pub fn new(stream: S, backoff: B) -> Self {
        Self {
            stream,
            backoff,
            delay: None,
            given_up: false,
        }
    }
}

impl<S, B, K> Stream for StreamBackoff<S, B>
where
    S: TryStream<Ok = Event<K>, Error = WatcherError>,
    B: Backoff,
{
    type Item = Result<Event<K>, WatcherError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.given_up {
            return Poll::Ready(None);
        }

        if let Some(delay) = this.delay.as_mut() {
            if delay.as_mut().poll(cx).is_pending() {
                return Poll::Pending;
            }

            tracing::trace!("Watch backoff elapsed");
            *this.delay = None;
        }

        let next = this.stream.try_poll_next(cx);
        match &next {
            Poll::Ready(Some(Err(_))) => match this.backoff.next() {
                Some(duration) => {
                    tracing::debug!(?duration, "Watch error, backing off");
                    *this.delay = Some(Box::pin(sleep(duration)));
                },
                None => {
                    tracing::debug!("Watch error, backoff has given up");
                    *this.given_up = true;
                },
            },
            Poll::Ready(Some(Ok(Event::Init))) => (),
            Poll::Ready(Some(Ok(_))) => this.backoff.reset(),
            Poll::Ready(None) | Poll::Pending => (),
        }

        next
    }
}
