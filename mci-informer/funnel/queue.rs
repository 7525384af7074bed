use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::funnel::{FunnelItem, RateLimit};
use crate::{ChangeEvent, EventIdentity};

#[cfg(test)]
#[path = "./queue.tests.rs"]
mod queue_tests;

/// Possible errors from [`EventFunnel`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FunnelError {
    /// Funnel was closed and all pending items were drained.
    #[error("event funnel is closed")]
    Closed,

    /// Item failed too many times and was dropped.
    #[error("item {identity} has been requeued {retries} times, but still fails")]
    RetryBudgetExhausted { identity: EventIdentity, retries: u32 },

    /// Item was not handed out by the funnel or was already given back.
    #[error("item {0} is not being processed")]
    NotInFlight(EventIdentity),
}

/// Snapshot of the [`EventFunnel`] counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FunnelStats {
    /// Items ready to be popped.
    pub queued: usize,
    /// Items handed out and not yet finished or requeued.
    pub in_flight: usize,
    /// Items waiting for the rate limiter.
    pub delayed: usize,
    /// Identities that have a non-zero retry count.
    pub retrying: usize,
    /// Items dropped after exhausting the retry budget.
    pub dropped: u64,
}

/// Deduplicating, rate limited, bounded retry queue of [`ChangeEvent`]s.
///
/// Many producers can [`push`](Self::push) concurrently, consumers [`pop`](Self::pop) items one at a time
/// and have to give every item back with [`finish`](Self::finish) or [`requeue`](Self::requeue).
/// At most one instance of an identity is pending at any moment and an identity is never handed out
/// twice at the same time.
pub struct EventFunnel {
    state: Mutex<FunnelState>,
    notify: Notify,
    rate_limit: RateLimit,
}

impl EventFunnel {
    /// Creates new [`EventFunnel`] instance.
    pub fn new(retry_ceiling: u32, rate_limit: RateLimit) -> Self {
        Self {
            state: Mutex::new(FunnelState::new(retry_ceiling)),
            notify: Notify::new(),
            rate_limit,
        }
    }

    /// Puts an event into the funnel without blocking.\
    /// If the event's identity is already pending, only its payload is replaced.
    pub fn push(&self, event: ChangeEvent) -> Result<(), FunnelError> {
        let identity = event.identity();
        {
            let mut state = self.state();
            if state.closed {
                tracing::trace!(%identity, "Event rejected, funnel is closed");
                return Err(FunnelError::Closed);
            }

            let Some(event) = state.coalesce(&identity, event) else {
                tracing::trace!(%identity, "Event coalesced with the pending one");
                return Ok(());
            };

            let delay = self.rate_limit.delay(state.retries_of(&identity));
            if delay.is_zero() {
                state.add_ready(identity, event);
            } else {
                state.schedule(identity, event, Instant::now() + delay);
            }
        }

        self.notify.notify_waiters();
        Ok(())
    }

    /// Waits for the next item and marks it as in-flight.\
    /// Returns [`FunnelError::Closed`] once the funnel is closed and all pending items are drained.
    pub async fn pop(&self) -> Result<FunnelItem, FunnelError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_ready_at = {
                let mut state = self.state();
                state.promote_ready(Instant::now());
                if let Some(item) = state.take_next() {
                    return Ok(item);
                }

                // payloads waiting behind an in-flight copy are served once that copy is given back
                if state.closed && state.dirty.is_empty() && state.delayed.is_empty() {
                    return Err(FunnelError::Closed);
                }

                state.next_ready_at()
            };

            match next_ready_at {
                Some(deadline) => {
                    tokio::select! {
                        () = notified.as_mut() => (),
                        () = tokio::time::sleep_until(deadline) => (),
                    }
                },
                None => notified.await,
            }
        }
    }

    /// Marks item as successfully processed and forgets its retry count.\
    /// Returns [`FunnelError::NotInFlight`] if the item was already finished or requeued.
    pub fn finish(&self, item: &FunnelItem) -> Result<(), FunnelError> {
        let identity = item.identity();
        let requeued = {
            let mut state = self.state();
            if !state.processing.contains(identity) {
                return Err(FunnelError::NotInFlight(identity.clone()));
            }

            state.retries.remove(identity);
            state.done(identity)
        };

        if requeued {
            self.notify.notify_waiters();
        }

        Ok(())
    }

    /// Puts the failed item back to the funnel, delayed by the rate limiter.\
    /// Once the retry ceiling is reached, the item is dropped and [`FunnelError::RetryBudgetExhausted`] is returned.
    pub fn requeue(&self, item: &FunnelItem) -> Result<(), FunnelError> {
        let identity = item.identity();
        let result = {
            let mut state = self.state();
            if !state.processing.contains(identity) {
                return Err(FunnelError::NotInFlight(identity.clone()));
            }

            self.requeue_in(&mut state, item)
        };

        // giving an item back can release a payload that was waiting behind it
        self.notify.notify_waiters();
        result
    }

    fn requeue_in(&self, state: &mut FunnelState, item: &FunnelItem) -> Result<(), FunnelError> {
        let identity = item.identity();
        if state.closed {
            state.retries.remove(identity);
            state.done(identity);
            return Err(FunnelError::Closed);
        }

        let retries = state.retries_of(identity);
        if retries >= state.retry_ceiling {
            state.retries.remove(identity);
            state.dropped += 1;
            state.done(identity);
            tracing::warn!(%identity, retries, "Retry budget exhausted, dropping item");
            return Err(FunnelError::RetryBudgetExhausted {
                identity: identity.clone(),
                retries,
            });
        }

        state.retries.insert(identity.clone(), retries + 1);
        state.done(identity);

        if state.is_pending(identity) {
            tracing::debug!(%identity, "Newer event is already pending, requeued payload superseded");
        } else {
            let delay = self.rate_limit.delay(retries);
            tracing::debug!(%identity, retries = retries + 1, ?delay, "Item requeued");
            if delay.is_zero() {
                state.add_ready(identity.clone(), item.event.clone());
            } else {
                state.schedule(identity.clone(), item.event.clone(), Instant::now() + delay);
            }
        }

        Ok(())
    }

    /// Stops accepting new items. Items already waiting for the rate limiter become ready immediately,
    /// blocked [`pop`](Self::pop) calls return [`FunnelError::Closed`] once everything is drained.
    pub fn close(&self) {
        {
            let mut state = self.state();
            if state.closed {
                return;
            }

            state.closed = true;
            state.flush_delayed();
        }

        tracing::debug!("Event funnel closed");
        self.notify.notify_waiters();
    }

    /// Sets new retry ceiling, it applies to subsequent requeue decisions.
    pub fn set_retry_ceiling(&self, retry_ceiling: u32) {
        self.state().retry_ceiling = retry_ceiling;
    }

    /// Returns current retry ceiling.
    pub fn retry_ceiling(&self) -> u32 {
        self.state().retry_ceiling
    }

    /// Returns how many times the identity was requeued since it was last finished.
    pub fn num_requeues(&self, identity: &EventIdentity) -> u32 {
        self.state().retries_of(identity)
    }

    /// Returns `true` if the funnel was closed.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Returns number of pending items, both ready and delayed.
    pub fn len(&self) -> usize {
        let state = self.state();
        state.dirty.len() + state.delayed.len()
    }

    /// Returns `true` if there are no pending items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns snapshot of the funnel counters.
    pub fn stats(&self) -> FunnelStats {
        let state = self.state();
        FunnelStats {
            queued: state.queue.len(),
            in_flight: state.processing.len(),
            delayed: state.delayed.len(),
            retrying: state.retries.len(),
            dropped: state.dropped,
        }
    }

    fn state(&self) -> MutexGuard<'_, FunnelState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Item waiting for the rate limiter.
struct Delayed {
    seq: u64,
    event: ChangeEvent,
}

/// Entry of the rate limiter timeline, stale entries are skipped by comparing `seq`.
struct Scheduled {
    ready_at: Instant,
    seq: u64,
    identity: EventIdentity,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed, so the max-heap pops the earliest deadline first
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Internal funnel bookkeeping, always accessed under the lock.
struct FunnelState {
    queue: VecDeque<EventIdentity>,
    dirty: HashMap<EventIdentity, ChangeEvent>,
    processing: HashSet<EventIdentity>,
    delayed: HashMap<EventIdentity, Delayed>,
    timeline: BinaryHeap<Scheduled>,
    retries: HashMap<EventIdentity, u32>,
    retry_ceiling: u32,
    dropped: u64,
    seq: u64,
    closed: bool,
}

impl FunnelState {
    fn new(retry_ceiling: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            dirty: HashMap::new(),
            processing: HashSet::new(),
            delayed: HashMap::new(),
            timeline: BinaryHeap::new(),
            retries: HashMap::new(),
            retry_ceiling,
            dropped: 0,
            seq: 0,
            closed: false,
        }
    }

    fn retries_of(&self, identity: &EventIdentity) -> u32 {
        self.retries.get(identity).copied().unwrap_or_default()
    }

    fn is_pending(&self, identity: &EventIdentity) -> bool {
        self.dirty.contains_key(identity) || self.delayed.contains_key(identity)
    }

    /// Replaces payload of an already pending identity.\
    /// Gives the event back if nothing is pending for that identity.
    fn coalesce(&mut self, identity: &EventIdentity, event: ChangeEvent) -> Option<ChangeEvent> {
        if let Some(pending) = self.dirty.get_mut(identity) {
            *pending = event;
            None
        } else if let Some(delayed) = self.delayed.get_mut(identity) {
            delayed.event = event;
            None
        } else {
            Some(event)
        }
    }

    /// Makes the event visible to consumers, unless its identity is in-flight.\
    /// In-flight identities are queued again when they are done.
    fn add_ready(&mut self, identity: EventIdentity, event: ChangeEvent) {
        if let Some(pending) = self.dirty.get_mut(&identity) {
            *pending = event;
            return;
        }

        if !self.processing.contains(&identity) {
            self.queue.push_back(identity.clone());
        }

        self.dirty.insert(identity, event);
    }

    fn schedule(&mut self, identity: EventIdentity, event: ChangeEvent, ready_at: Instant) {
        self.seq += 1;
        let seq = self.seq;
        self.timeline.push(Scheduled {
            ready_at,
            seq,
            identity: identity.clone(),
        });
        self.delayed.insert(identity, Delayed { seq, event });
    }

    /// Moves all delayed items whose time has come to the ready queue.
    fn promote_ready(&mut self, now: Instant) {
        while self.timeline.peek().is_some_and(|s| s.ready_at <= now) {
            let Some(scheduled) = self.timeline.pop() else {
                break;
            };

            self.promote(&scheduled);
        }
    }

    fn flush_delayed(&mut self) {
        while let Some(scheduled) = self.timeline.pop() {
            self.promote(&scheduled);
        }
    }

    fn promote(&mut self, scheduled: &Scheduled) {
        if self
            .delayed
            .get(&scheduled.identity)
            .is_some_and(|d| d.seq == scheduled.seq)
            && let Some(delayed) = self.delayed.remove(&scheduled.identity)
        {
            self.add_ready(scheduled.identity.clone(), delayed.event);
        }
    }

    fn next_ready_at(&self) -> Option<Instant> {
        self.timeline.peek().map(|s| s.ready_at)
    }

    fn take_next(&mut self) -> Option<FunnelItem> {
        while let Some(identity) = self.queue.pop_front() {
            if let Some(event) = self.dirty.remove(&identity) {
                self.processing.insert(identity.clone());
                let retries = self.retries_of(&identity);
                return Some(FunnelItem::new(identity, event, retries));
            }
        }

        None
    }

    /// Clears in-flight mark, returns `true` if the identity was pushed meanwhile and is queued again.
    fn done(&mut self, identity: &EventIdentity) -> bool {
        if self.processing.remove(identity) && self.dirty.contains_key(identity) {
            self.queue.push_back(identity.clone());
            true
        } else {
            false
        }
    }
}
