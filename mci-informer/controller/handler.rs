use std::sync::{Arc, RwLock};

use crate::ChangeEvent;

#[cfg(test)]
#[path = "./handler.tests.rs"]
mod handler_tests;

/// Business logic invoked for every event taken from the funnel.
pub type EventHandler = Arc<dyn Fn(&ChangeEvent) -> anyhow::Result<()> + Send + Sync>;

/// Single slot for the event handler.\
/// **Note** that registering a new handler replaces the previous one, handlers are never chained.
#[derive(Default)]
pub struct HandlerRegistry {
    handler: RwLock<Option<EventHandler>>,
}

impl HandlerRegistry {
    /// Registers `handler`, replacing the current one.
    pub fn set(&self, handler: impl Fn(&ChangeEvent) -> anyhow::Result<()> + Send + Sync + 'static) {
        let handler: EventHandler = Arc::new(handler);
        let mut slot = self.handler.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if slot.replace(handler).is_some() {
            tracing::debug!("Event handler replaced");
        }
    }

    /// Returns `true` if a handler is registered.
    pub fn is_set(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }

    /// Invokes the registered handler, it is a no-op that succeeds if there is none.
    pub fn handle(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        let handler = self
            .handler
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        match handler {
            Some(handler) => handler(event),
            None => Ok(()),
        }
    }
}
