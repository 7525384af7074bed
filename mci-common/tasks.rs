use std::time::Duration;
use tokio::task::JoinHandle;

#[cfg(test)]
#[path = "./tasks.tests.rs"]
mod tasks_tests;

/// Time given to a cancelled task to finish on its own before it is aborted.
pub const DEFAULT_TASK_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Waits for a cancelled task to end, aborting it if it does not finish within `grace_period`.
pub async fn wait_for_task<T>(task: Option<JoinHandle<T>>, task_name: &str, grace_period: Duration) {
    let Some(mut task) = task else {
        return;
    };

    match tokio::time::timeout(grace_period, &mut task).await {
        Ok(Ok(_)) => (),
        Ok(Err(error)) if error.is_cancelled() => (),
        Ok(Err(error)) => tracing::error!("{task_name} task failed: {error}"),
        Err(_) => {
            task.abort();
            tracing::error!(
                "Failed to stop {task_name} task in {} milliseconds, task aborted.",
                grace_period.as_millis()
            );
        },
    }
}

/// Waits for all cancelled tasks to end, see [`wait_for_task`].
pub async fn wait_for_tasks<T>(tasks: Vec<JoinHandle<T>>, task_name: &str, grace_period: Duration) {
    let deadline = tokio::time::Instant::now() + grace_period;
    for task in tasks {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        wait_for_task(Some(task), task_name, remaining).await;
    }
}
