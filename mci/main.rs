use anyhow::Result;
use clap::Parser;
use mci_config::{APP_NAME, APP_VERSION, Config};
use mci_informer::{ChangeEvent, FunnelError, MultiClusterInformer, ProcessOutcome};
use std::sync::Arc;
use tokio::runtime::Builder;
use tracing::{error, info, warn};

mod cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let _logging_guard = mci_common::logging::initialize(APP_NAME, args.log_dir.as_deref())?;
    info!("{APP_NAME} v{APP_VERSION} started");

    if let Err(error) = run_application(&args) {
        error!("{APP_NAME} v{APP_VERSION} terminated with an error: {error:#}");
        Err(error)
    } else {
        info!("{APP_NAME} v{APP_VERSION} stopped");
        Ok(())
    }
}

fn run_application(args: &cli::Args) -> Result<()> {
    let rt = Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(args))
}

async fn run(args: &cli::Args) -> Result<()> {
    let mut config = Config::load(&args.config).await?;
    args.apply_overrides(&mut config);
    info!(
        clusters = config.clusters.len(),
        max_requeue = config.max_requeue_time,
        "Configuration loaded from {}",
        args.config.display()
    );

    let providers = mci_kube::connect_all(&config).await?;
    let informer = Arc::new(MultiClusterInformer::from_config(&config, providers)?);
    informer.add_event_handler(log_event);

    let mut watch_set = tokio::spawn({
        let informer = Arc::clone(&informer);
        async move { informer.run().await }
    });
    let consumer = tokio::spawn({
        let informer = Arc::clone(&informer);
        async move { consume(&informer).await }
    });

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
            informer.stop()?;
            watch_set.await?
        },
        result = &mut watch_set => result?,
    };

    consumer.await?;
    Ok(result?)
}

/// Consumer loop, it ends when the informer is stopped and all pending events are processed.
async fn consume(informer: &MultiClusterInformer) {
    loop {
        match informer.process_next().await {
            Ok(ProcessOutcome::Finished | ProcessOutcome::Requeued) => (),
            Ok(ProcessOutcome::Dropped) => warn!("Event dropped after exhausting its retries"),
            Err(FunnelError::Closed) => break,
            Err(error) => error!("Cannot process event: {error}"),
        }
    }
}

fn log_event(event: &ChangeEvent) -> Result<()> {
    info!(
        source = %event.source,
        kind = %event.kind,
        key = %event.key,
        event = %event.event,
        snapshot = event.object.is_some(),
        "Resource changed"
    );

    Ok(())
}
