use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::{EventKind, ResourceKind};

fn event() -> ChangeEvent {
    ChangeEvent::new("c1", EventKind::Add, ResourceKind::Pods, "default/x")
}

#[test]
fn missing_handler_is_noop_test() {
    let registry = HandlerRegistry::default();

    assert!(!registry.is_set());
    assert!(registry.handle(&event()).is_ok());
}

#[test]
fn last_registration_wins_test() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let registry = HandlerRegistry::default();

    let counter = Arc::clone(&first);
    registry.set(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });

    let counter = Arc::clone(&second);
    registry.set(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });

    registry.handle(&event()).unwrap();
    registry.handle(&event()).unwrap();

    assert!(registry.is_set());
    assert_eq!(0, first.load(Ordering::Relaxed));
    assert_eq!(2, second.load(Ordering::Relaxed));
}

#[test]
fn handler_error_is_returned_test() {
    let registry = HandlerRegistry::default();
    registry.set(|event| anyhow::bail!("cannot handle {}", event.key));

    let error = registry.handle(&event()).unwrap_err();
    assert_eq!("cannot handle default/x", error.to_string());
}

#[test]
fn handler_can_be_replaced_from_within_test() {
    let registry = Arc::new(HandlerRegistry::default());
    let inner = Arc::clone(&registry);
    registry.set(move |_| {
        inner.set(|_| anyhow::bail!("replaced"));
        Ok(())
    });

    assert!(registry.handle(&event()).is_ok());
    assert!(registry.handle(&event()).is_err());
}
