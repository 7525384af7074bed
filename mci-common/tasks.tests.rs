use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::*;

#[tokio::test]
async fn wait_for_finished_task_test() {
    let done = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn({
        let done = Arc::clone(&done);
        async move { done.store(true, Ordering::Relaxed) }
    });

    wait_for_task(Some(task), "test", Duration::from_secs(1)).await;

    assert!(done.load(Ordering::Relaxed));
}

#[tokio::test(start_paused = true)]
async fn hanging_task_is_aborted_test() {
    let task = tokio::spawn(std::future::pending::<()>());
    let handle = task.abort_handle();

    wait_for_tasks(vec![task], "test", Duration::from_millis(50)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert!(handle.is_finished());
}

#[tokio::test]
async fn no_task_test() {
    wait_for_task::<()>(None, "test", Duration::from_millis(1)).await;
}
