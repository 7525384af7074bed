use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes logging and returns worker guard that will flush logs on drop.\
/// When `log_dir` is provided, logs go to a daily rolling file in that directory, otherwise to `stderr`.
pub fn initialize(app_name: &str, log_dir: Option<&Path>) -> Result<WorkerGuard> {
    let (non_blocking_writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
            tracing_appender::non_blocking(appender)
        },
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let timer = time::format_description::parse("[year]-[month padding:zero]-[day padding:zero] [hour]:[minute]:[second]")?;
    let time_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(time_offset, timer);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(app_name)));

    #[cfg(debug_assertions)]
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_timer(timer)
        .with_ansi(log_dir.is_none())
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    #[cfg(not(debug_assertions))]
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_thread_ids(true)
        .with_timer(timer)
        .with_ansi(log_dir.is_none())
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(guard)
}

/// Returns default filter directives: warnings from dependencies, info from the application crates.
fn default_directives(app_name: &str) -> String {
    let crate_name = app_name.replace('-', "_");
    format!("warn,{crate_name}=info,{crate_name}_informer=info,{crate_name}_kube=info")
}
