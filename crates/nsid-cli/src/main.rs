#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::commands::run;
use cli::config::{CliArgs, CliConfig};
use cli::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let cancel = CancellationToken::new();
    spawn_cancellation(&config, &cancel);

    let mut stdout = std::io::stdout().lock();
    run(&config, &cancel, &mut stdout).await
}

fn log_startup_info(config: &CliConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Running with full config: {:#?}", config);
    } else {
        tracing::debug!(
            "Using registry '{}' in {}",
            config.key,
            config.store_dir.display()
        );
    }
}

/// Fires `cancel` on Ctrl+C or once the configured timeout elapses.
fn spawn_cancellation(config: &CliConfig, cancel: &CancellationToken) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C signal, cancelling");
            on_signal.cancel();
        }
    });

    if let Some(timeout) = config.timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!("Timed out after {}s, cancelling", timeout.as_secs());
            on_timeout.cancel();
        });
    }
}
