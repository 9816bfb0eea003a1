use anyhow::bail;
use clap::{Parser, Subcommand};
use core::time::Duration;
use nsid::{BackoffPolicy, DEFAULT_MAX_DOCUMENT_BYTES, RegistryKey};
use std::path::PathBuf;

/// Command-line arguments for the `nsid` binary.
///
/// Every option can also be supplied through the environment (a `.env` file in
/// the working directory is loaded first). Values are validated by
/// [`CliConfig::try_from`] before the registry is touched.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nsid",
    version,
    about = "Allocate and inspect durable namespace identifiers"
)]
pub struct CliArgs {
    /// Directory holding registry documents.
    ///
    /// Every process that must agree on identifiers has to point at the same
    /// directory.
    ///
    /// Environment variable: `NSID_STORE_DIR`
    #[arg(long, env = "NSID_STORE_DIR", default_value = "./.nsid")]
    pub store_dir: PathBuf,

    /// Name of the registry document.
    ///
    /// Environment variable: `NSID_REGISTRY_NAME`
    #[arg(long, env = "NSID_REGISTRY_NAME", default_value_t = String::from("namespace-id"))]
    pub registry_name: String,

    /// Location (sub-directory) of the registry document.
    ///
    /// Environment variable: `NSID_REGISTRY_LOCATION`
    #[arg(long, env = "NSID_REGISTRY_LOCATION", default_value_t = String::from("default"))]
    pub registry_location: String,

    /// Backoff before the first retry after a conflicting update.
    ///
    /// Environment variable: `NSID_INITIAL_BACKOFF_MS`
    #[arg(long, env = "NSID_INITIAL_BACKOFF_MS", default_value_t = 500)]
    pub initial_backoff_ms: u64,

    /// Cap on any single backoff.
    ///
    /// Environment variable: `NSID_MAX_BACKOFF_MS`
    #[arg(long, env = "NSID_MAX_BACKOFF_MS", default_value_t = 60_000)]
    pub max_backoff_ms: u64,

    /// Give up retrying after this many seconds. `0` retries without a time
    /// bound.
    ///
    /// Environment variable: `NSID_MAX_ELAPSED_SECS`
    #[arg(long, env = "NSID_MAX_ELAPSED_SECS", default_value_t = 900)]
    pub max_elapsed_secs: u64,

    /// Give up retrying after this many attempts. `0` retries without an
    /// attempt bound.
    ///
    /// Environment variable: `NSID_MAX_ATTEMPTS`
    #[arg(long, env = "NSID_MAX_ATTEMPTS", default_value_t = 0)]
    pub max_attempts: u32,

    /// Abort the command after this many seconds. `0` disables the timeout.
    ///
    /// Environment variable: `NSID_TIMEOUT_SECS`
    #[arg(long, env = "NSID_TIMEOUT_SECS", default_value_t = 0)]
    pub timeout_secs: u64,

    /// Ceiling on the encoded size of the registry document.
    ///
    /// Environment variable: `NSID_MAX_DOCUMENT_BYTES`
    #[arg(long, env = "NSID_MAX_DOCUMENT_BYTES", default_value_t = DEFAULT_MAX_DOCUMENT_BYTES)]
    pub max_document_bytes: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the namespace's identifier, allocating one if needed.
    Get { namespace: String },
    /// Pin the namespace to a specific identifier.
    Set { namespace: String, id: String },
    /// Remove the namespace's entry.
    Delete { namespace: String },
    /// Print every namespace and its identifier.
    List,
    /// Print fresh identifiers without touching the registry.
    Generate {
        /// How many identifiers to print.
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub store_dir: PathBuf,
    pub key: RegistryKey,
    pub policy: BackoffPolicy,
    pub timeout: Option<Duration>,
    pub max_document_bytes: usize,
    pub command: Command,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let key = RegistryKey::new(args.registry_name, args.registry_location)?;

        if args.max_backoff_ms < args.initial_backoff_ms {
            bail!(
                "NSID_MAX_BACKOFF_MS ({}) must not be less than NSID_INITIAL_BACKOFF_MS ({})",
                args.max_backoff_ms,
                args.initial_backoff_ms
            );
        }

        if args.max_document_bytes == 0 {
            bail!("NSID_MAX_DOCUMENT_BYTES must be greater than 0");
        }

        match &args.command {
            Command::Get { namespace }
            | Command::Set { namespace, .. }
            | Command::Delete { namespace } => {
                if namespace.is_empty() {
                    bail!("namespace must not be empty");
                }
            }
            Command::Generate { count } if *count == 0 => {
                bail!("--count must be greater than 0");
            }
            Command::List | Command::Generate { .. } => {}
        }

        if let Command::Set { id, .. } = &args.command {
            if id.is_empty() {
                bail!("identifier must not be empty");
            }
        }

        let policy = BackoffPolicy::default()
            .with_initial_interval(Duration::from_millis(args.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(args.max_backoff_ms))
            .with_max_elapsed(
                (args.max_elapsed_secs > 0).then(|| Duration::from_secs(args.max_elapsed_secs)),
            )
            .with_max_attempts((args.max_attempts > 0).then_some(args.max_attempts));

        Ok(Self {
            store_dir: args.store_dir,
            key,
            policy,
            timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
            max_document_bytes: args.max_document_bytes,
            command: args.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("nsid").chain(args.iter().copied()))?;
        CliConfig::try_from(args)
    }

    #[test]
    fn defaults_match_library_defaults() {
        let config = parse(&["list"]).unwrap();
        assert_eq!(config.key.to_string(), "default/namespace-id");
        assert_eq!(config.policy, BackoffPolicy::default());
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
        assert_eq!(config.command, Command::List);
    }

    #[test]
    fn zero_means_unbounded() {
        let config = parse(&[
            "--max-elapsed-secs",
            "0",
            "--max-attempts",
            "0",
            "--timeout-secs",
            "0",
            "get",
            "team-a",
        ])
        .unwrap();
        assert_eq!(config.policy.max_elapsed, None);
        assert_eq!(config.policy.max_attempts, None);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn bounds_are_applied() {
        let config = parse(&[
            "--initial-backoff-ms",
            "10",
            "--max-backoff-ms",
            "20",
            "--max-attempts",
            "5",
            "--timeout-secs",
            "3",
            "set",
            "team-a",
            "X",
        ])
        .unwrap();
        assert_eq!(config.policy.initial_interval, Duration::from_millis(10));
        assert_eq!(config.policy.max_interval, Duration::from_millis(20));
        assert_eq!(config.policy.max_attempts, Some(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(
            config.command,
            Command::Set {
                namespace: "team-a".to_owned(),
                id: "X".to_owned()
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for args in [
            &["--registry-name", "a/b", "list"][..],
            &["--registry-location", "..", "list"][..],
            &["--initial-backoff-ms", "100", "--max-backoff-ms", "10", "list"][..],
            &["--max-document-bytes", "0", "list"][..],
            &["get", ""][..],
            &["set", "team-a", ""][..],
            &["generate", "--count", "0"][..],
        ] {
            assert!(parse(args).is_err(), "{args:?} should be rejected");
        }
    }
}
