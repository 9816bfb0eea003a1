//! Log output for the `nsid` binary.
//!
//! Events are written to stderr so that command output on stdout stays
//! machine-readable. The filter is read from `RUST_LOG` and defaults to
//! `info`; set `RUST_LOG=nsid=debug` to watch every read-modify-write cycle,
//! including conflicts and backoff.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
