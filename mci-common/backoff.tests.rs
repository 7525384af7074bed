use std::time::Duration;

use super::*;

#[test]
fn never_gives_up_test() {
    let mut backoff = ResettableBackoff::new(Duration::from_millis(10), Duration::from_millis(40));

    for _ in 0..20 {
        assert!(backoff.next_backoff().is_some());
    }
}

#[test]
fn delays_stay_within_bounds_test() {
    let mut backoff = ResettableBackoff::new(Duration::from_millis(10), Duration::from_millis(40));

    // jitter can at most double a single delay
    for delay in backoff.by_ref().take(10) {
        assert!(delay >= Duration::from_millis(10));
        assert!(delay <= Duration::from_millis(80));
    }
}

#[test]
fn reset_starts_from_minimal_delay_test() {
    let mut backoff = ResettableBackoff::new(Duration::from_millis(100), Duration::from_secs(10));
    for _ in 0..6 {
        backoff.next_backoff();
    }

    backoff.reset();

    let delay = backoff.next_backoff().unwrap();
    assert!(delay < Duration::from_millis(400));
}
