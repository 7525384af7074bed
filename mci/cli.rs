use clap::Parser;
use mci_config::{Config, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

#[cfg(test)]
#[path = "./cli.tests.rs"]
mod cli_tests;

/// mci watches resources in many Kubernetes clusters and funnels their changes into one queue.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(long, short, env = "MCI_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory for the log files, logs are written to stderr if not set.
    #[arg(long, env = "MCI_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// How many times a failed event can be requeued, overrides the configuration file.
    #[arg(long)]
    pub max_requeue: Option<u32>,
}

impl Args {
    /// Applies command line overrides to the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(max_requeue) = self.max_requeue {
            config.max_requeue_time = max_requeue;
        }
    }
}
