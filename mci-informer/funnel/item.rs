use std::ops::Deref;

use crate::{ChangeEvent, EventIdentity};

/// Unit handed out by the [`EventFunnel`](crate::EventFunnel) to its consumer.\
/// It must be given back with either `finish` or `requeue`.
#[derive(Debug, Clone)]
pub struct FunnelItem {
    pub event: ChangeEvent,
    identity: EventIdentity,
    retries: u32,
}

impl FunnelItem {
    /// Creates new [`FunnelItem`] instance.
    pub(crate) fn new(identity: EventIdentity, event: ChangeEvent, retries: u32) -> Self {
        Self {
            event,
            identity,
            retries,
        }
    }

    /// Returns deduplication identity of the item.
    pub fn identity(&self) -> &EventIdentity {
        &self.identity
    }

    /// Returns how many times the item was put back to the funnel before it was popped.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl Deref for FunnelItem {
    type Target = ChangeEvent;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}
