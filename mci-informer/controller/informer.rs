use mci_common::tasks::{DEFAULT_TASK_GRACE_PERIOD, wait_for_tasks};
use mci_config::Config;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::controller::sink::FunnelSink;
use crate::controller::watch_set::{ResourceSpec, SourceSpec, WatchTarget, expand_targets};
use crate::controller::{HandlerRegistry, InformerState};
use crate::{
    AggregatedStore, ChangeEvent, EventFunnel, FunnelError, FunnelItem, FunnelStats, KindSelector, ProviderError,
    RateLimit, SharedObject, WatchProvider,
};

#[cfg(test)]
#[path = "./informer.tests.rs"]
mod informer_tests;

const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Possible errors from [`MultiClusterInformer`].
#[derive(thiserror::Error, Debug)]
pub enum InformerError {
    /// Watch set could not be set up.
    #[error("failed to set up watchers: {0}")]
    Setup(#[from] ProviderError),

    /// No watch provider was supplied for a configured cluster.
    #[error("no watch provider for cluster '{0}'")]
    MissingSource(String),

    /// Informer was stopped before all watchers completed the initial synchronization.
    #[error("stopped before the initial synchronization completed")]
    SyncAborted,

    /// Watchers did not complete the initial synchronization in time.
    #[error("initial synchronization did not complete in {} seconds", .0.as_secs())]
    SyncTimeout(Duration),

    /// Informer is already running (or was run before).
    #[error("informer is already started")]
    AlreadyStarted,

    /// Informer is stopping or stopped.
    #[error("informer is already stopped")]
    AlreadyStopped,
}

/// Result of a single consumer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Event was handled and finished.
    Finished,

    /// Handler failed, event was put back to the funnel.
    Requeued,

    /// Handler failed and the event cannot be retried any more.
    Dropped,
}

/// Informer settings that are not tied to a single source.
#[derive(Debug, Clone, Default)]
pub struct InformerSettings {
    pub retry_ceiling: u32,
    pub rate_limit: RateLimit,
    pub sync_timeout: Option<Duration>,
}

impl From<&Config> for InformerSettings {
    fn from(value: &Config) -> Self {
        Self {
            retry_ceiling: value.max_requeue_time,
            rate_limit: (&value.rate_limit).into(),
            sync_timeout: value.sync_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Watches resources in many clusters and funnels all observed changes into one queue.
///
/// Lifecycle is `Constructed -> Starting -> Running -> Stopping -> Stopped`.
/// [`run`](Self::run) starts all watchers, waits until every one of them completed its initial listing
/// and then blocks until [`stop`](Self::stop) is called.
pub struct MultiClusterInformer {
    sources: Vec<SourceSpec>,
    funnel: Arc<EventFunnel>,
    store: OnceLock<AggregatedStore>,
    handlers: HandlerRegistry,
    state: AtomicU8,
    cancellation_token: CancellationToken,
    sync_timeout: Option<Duration>,
}

impl MultiClusterInformer {
    /// Creates new [`MultiClusterInformer`] instance.
    pub fn new(settings: InformerSettings, sources: Vec<SourceSpec>) -> Self {
        Self {
            sources,
            funnel: Arc::new(EventFunnel::new(settings.retry_ceiling, settings.rate_limit)),
            store: OnceLock::new(),
            handlers: HandlerRegistry::default(),
            state: AtomicU8::new(InformerState::Constructed.into()),
            cancellation_token: CancellationToken::new(),
            sync_timeout: settings.sync_timeout,
        }
    }

    /// Creates new [`MultiClusterInformer`] instance for the configured clusters.\
    /// Every cluster must have its watch provider in `providers`, matched by the source name.
    pub fn from_config(config: &Config, providers: Vec<Arc<dyn WatchProvider>>) -> Result<Self, InformerError> {
        let mut sources = Vec::with_capacity(config.clusters.len());
        for cluster in &config.clusters {
            let provider = providers
                .iter()
                .find(|p| p.source() == cluster.name())
                .ok_or_else(|| InformerError::MissingSource(cluster.name().to_owned()))?;
            let resources = cluster.resources().iter().map(ResourceSpec::from).collect();
            sources.push(SourceSpec::new(Arc::clone(provider), resources));
        }

        Ok(Self::new(config.into(), sources))
    }

    /// Returns current lifecycle state.
    pub fn state(&self) -> InformerState {
        self.state.load(Ordering::Acquire).into()
    }

    /// Starts all watchers, waits for their initial synchronization and then blocks until stopped.
    pub async fn run(&self) -> Result<(), InformerError> {
        if let Err(state) = self.state.compare_exchange(
            InformerState::Constructed.into(),
            InformerState::Starting.into(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return if InformerState::from(state).is_stopped() {
                Err(InformerError::AlreadyStopped)
            } else {
                Err(InformerError::AlreadyStarted)
            };
        }

        tracing::info!(sources = self.sources.len(), "Starting informer");
        let tasks = match self.start_watchers().await {
            Ok(tasks) => tasks,
            Err(error) => {
                self.shutdown(Vec::new()).await;
                return Err(error);
            },
        };

        if let Err(error) = self.wait_for_sync().await {
            self.shutdown(tasks).await;
            return Err(error);
        }

        let is_running = self
            .state
            .compare_exchange(
                InformerState::Starting.into(),
                InformerState::Running.into(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !is_running {
            self.shutdown(tasks).await;
            return Err(InformerError::SyncAborted);
        }

        tracing::info!(watchers = tasks.len(), "All watchers synced, informer is running");
        if !self.handlers.is_set() {
            tracing::debug!("No event handler registered, events are finished without processing");
        }

        self.cancellation_token.cancelled().await;
        self.shutdown(tasks).await;

        Ok(())
    }

    /// Stops all watchers and closes the funnel.\
    /// Only the first call succeeds, every next one returns [`InformerError::AlreadyStopped`].
    pub fn stop(&self) -> Result<(), InformerError> {
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| match InformerState::from(state) {
                InformerState::Constructed => Some(InformerState::Stopped.into()),
                InformerState::Starting | InformerState::Running => Some(InformerState::Stopping.into()),
                InformerState::Stopping | InformerState::Stopped => None,
            })
            .map_err(|_| InformerError::AlreadyStopped)?;

        tracing::info!(state = %InformerState::from(previous), "Stopping informer");
        self.cancellation_token.cancel();
        self.funnel.close();

        Ok(())
    }

    /// Registers event handler, it replaces the previous one.
    pub fn add_event_handler(&self, handler: impl Fn(&ChangeEvent) -> anyhow::Result<()> + Send + Sync + 'static) {
        self.handlers.set(handler);
    }

    /// Invokes the registered event handler, succeeds if there is none.
    pub fn handle_object(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        self.handlers.handle(event)
    }

    /// Waits for the next event, see [`EventFunnel::pop`].
    pub async fn pop(&self) -> Result<FunnelItem, FunnelError> {
        self.funnel.pop().await
    }

    /// Marks item as successfully processed, see [`EventFunnel::finish`].
    pub fn finish(&self, item: &FunnelItem) -> Result<(), FunnelError> {
        self.funnel.finish(item)
    }

    /// Puts failed item back to the funnel, see [`EventFunnel::requeue`].
    pub fn requeue(&self, item: &FunnelItem) -> Result<(), FunnelError> {
        self.funnel.requeue(item)
    }

    /// Adjusts retry ceiling for subsequent requeue decisions.
    pub fn set_retry_ceiling(&self, retry_ceiling: u32) {
        self.funnel.set_retry_ceiling(retry_ceiling);
    }

    /// Returns snapshot of the funnel counters.
    pub fn stats(&self) -> FunnelStats {
        self.funnel.stats()
    }

    /// Takes the next event, passes it to the handler and finishes or requeues it depending on the result.\
    /// Returns [`FunnelError::Closed`] once the informer is stopped and all events are drained.
    pub async fn process_next(&self) -> Result<ProcessOutcome, FunnelError> {
        let item = self.funnel.pop().await?;
        let Err(error) = self.handlers.handle(&item) else {
            self.funnel.finish(&item)?;
            return Ok(ProcessOutcome::Finished);
        };

        tracing::warn!(identity = %item.identity(), retries = item.retries(), "Event handler failed: {error:#}");
        match self.funnel.requeue(&item) {
            Ok(()) => Ok(ProcessOutcome::Requeued),
            Err(error @ FunnelError::NotInFlight(_)) => Err(error),
            Err(error) => {
                tracing::error!(identity = %item.identity(), "Event dropped: {error}");
                Ok(ProcessOutcome::Dropped)
            },
        }
    }

    /// Returns objects of the selected kinds from all sources.
    pub fn list(&self, selector: impl Into<KindSelector>) -> Vec<SharedObject> {
        self.store.get().map(|s| s.list(selector)).unwrap_or_default()
    }

    /// Returns keys of the objects of the selected kinds from all sources.
    pub fn list_keys(&self, selector: impl Into<KindSelector>) -> Vec<String> {
        self.store.get().map(|s| s.list_keys(selector)).unwrap_or_default()
    }

    /// Returns all objects with the `key` and `true` if at least one was found.
    pub fn get_by_key(&self, selector: impl Into<KindSelector>, key: &str) -> (Vec<SharedObject>, bool) {
        self.store
            .get()
            .map_or_else(|| (Vec::new(), false), |s| s.get_by_key(selector, key))
    }

    async fn start_watchers(&self) -> Result<Vec<JoinHandle<()>>, InformerError> {
        let targets = expand_targets(&self.sources).await?;
        let mut store = AggregatedStore::new();
        let mut watches = Vec::with_capacity(targets.len());
        for WatchTarget {
            source,
            request,
            retain_objects,
        } in targets
        {
            let provider = &self.sources[source].provider;
            let sink = FunnelSink::new(
                provider.source().to_owned(),
                request.kind.clone(),
                retain_objects,
                Arc::clone(&self.funnel),
            );

            let watch = provider.start_watch(&request, Arc::new(sink), self.cancellation_token.child_token())?;
            tracing::debug!(
                source = provider.source(),
                kind = %request.kind,
                namespace = %request.namespace,
                "Watcher created"
            );
            store.register(request.kind, watch.cache);
            watches.push(watch.task);
        }

        let _ = self.store.set(store);

        Ok(watches.into_iter().map(tokio::spawn).collect())
    }

    async fn wait_for_sync(&self) -> Result<(), InformerError> {
        let Some(store) = self.store.get() else {
            return Ok(());
        };

        let synced = async {
            while !store.has_synced() {
                tokio::select! {
                    () = self.cancellation_token.cancelled() => return Err(InformerError::SyncAborted),
                    () = tokio::time::sleep(SYNC_POLL_INTERVAL) => (),
                }
            }

            Ok(())
        };

        match self.sync_timeout {
            Some(timeout) => tokio::time::timeout(timeout, synced)
                .await
                .unwrap_or(Err(InformerError::SyncTimeout(timeout))),
            None => synced.await,
        }
    }

    async fn shutdown(&self, tasks: Vec<JoinHandle<()>>) {
        self.cancellation_token.cancel();
        self.funnel.close();
        wait_for_tasks(tasks, "watcher", DEFAULT_TASK_GRACE_PERIOD).await;
        self.state.store(InformerState::Stopped.into(), Ordering::Release);
        tracing::info!("Informer stopped");
    }
}
