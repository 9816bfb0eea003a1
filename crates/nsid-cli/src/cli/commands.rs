use super::config::{CliConfig, Command};
use anyhow::Context;
use nsid::{Allocator, FileStore};
use std::{io::Write, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Runs the configured command, writing its output to `out`.
///
/// Registry commands stop early if `cancel` fires while they wait on a
/// conflicting writer.
pub async fn run<W: Write>(
    config: &CliConfig,
    cancel: &CancellationToken,
    out: &mut W,
) -> anyhow::Result<()> {
    match &config.command {
        Command::Get { namespace } => {
            let id = allocator(config)
                .get_or_allocate(cancel, namespace)
                .await
                .with_context(|| format!("failed to resolve identifier for '{namespace}'"))?;
            writeln!(out, "{id}")?;
        }
        Command::Set { namespace, id } => {
            allocator(config)
                .force_set(cancel, namespace, id)
                .await
                .with_context(|| format!("failed to set identifier for '{namespace}'"))?;
            tracing::info!(namespace = %namespace, id = %id, registry = %config.key, "identifier pinned");
        }
        Command::Delete { namespace } => {
            allocator(config)
                .delete(cancel, namespace)
                .await
                .with_context(|| format!("failed to delete '{namespace}'"))?;
            tracing::info!(namespace = %namespace, registry = %config.key, "namespace removed");
        }
        Command::List => {
            let entries = allocator(config)
                .entries(cancel)
                .await
                .with_context(|| format!("failed to read registry '{}'", config.key))?;
            for (namespace, id) in entries {
                writeln!(out, "{namespace}\t{id}")?;
            }
        }
        Command::Generate { count } => {
            for _ in 0..*count {
                writeln!(out, "{}", nsid::generate())?;
            }
        }
    }
    Ok(())
}

fn allocator(config: &CliConfig) -> Allocator<FileStore> {
    let store = FileStore::new(&config.store_dir).with_max_bytes(config.max_document_bytes);
    Allocator::new(Arc::new(store), config.key.clone()).with_policy(config.policy.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::CliArgs;
    use clap::Parser;
    use nsid::NamespaceId;
    use std::path::Path;

    fn config(dir: &Path, command: &[&str]) -> CliConfig {
        let store_dir = dir.to_str().unwrap();
        let args = ["nsid", "--store-dir", store_dir, "--max-attempts", "3"]
            .into_iter()
            .chain(command.iter().copied());
        CliConfig::try_from(CliArgs::try_parse_from(args).unwrap()).unwrap()
    }

    async fn output(dir: &Path, command: &[&str]) -> String {
        let mut out = Vec::new();
        run(&config(dir, command), &CancellationToken::new(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn get_set_delete_list() {
        let dir = tempfile::tempdir().unwrap();

        let id = output(dir.path(), &["get", "team-a"]).await;
        assert!(id.trim().parse::<NamespaceId>().is_ok());
        assert_eq!(output(dir.path(), &["get", "team-a"]).await, id);

        output(dir.path(), &["set", "team-b", "X"]).await;
        assert_eq!(
            output(dir.path(), &["list"]).await,
            format!("team-a\t{}team-b\tX\n", id)
        );

        output(dir.path(), &["delete", "team-a"]).await;
        assert_eq!(output(dir.path(), &["list"]).await, "team-b\tX\n");
    }

    #[tokio::test]
    async fn generate_prints_count_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let out = output(dir.path(), &["generate", "--count", "3"]).await;
        let ids: Vec<&str> = out.lines().collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.parse::<NamespaceId>().is_ok()));
        // Nothing was written to the store.
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn cancelled_command_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run(
            &config(dir.path(), &["get", "team-a"]),
            &cancel,
            &mut Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("team-a"));
        assert!(
            err.downcast_ref::<nsid::Error>()
                .is_some_and(nsid::Error::is_cancelled)
        );
    }

    #[tokio::test]
    async fn registry_commands_honor_document_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), &["set", "team-a", "X"]);
        config.max_document_bytes = 16;

        let err = run(&config, &CancellationToken::new(), &mut Vec::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<nsid::Error>()
                .and_then(nsid::Error::store_error)
                .and_then(nsid::StoreError::kind),
            Some(nsid::PermanentKind::TooLarge)
        );
    }
}
