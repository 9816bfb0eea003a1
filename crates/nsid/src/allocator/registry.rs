use crate::{
    AllocationRequest, BackoffPolicy, Document, DocumentStore, Error, RegistryKey, Result,
    RetryDriver, StoreError, generate,
};
use core::fmt;
use std::{collections::BTreeMap, sync::Arc};
use tokio_util::sync::CancellationToken;
#[cfg(feature = "tracing")]
use tracing::instrument;

type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Allocates, pins, and prunes namespace identifiers in one registry document.
///
/// Cloning is cheap: clones share the store and the identifier source, so an
/// allocator can be handed to as many tasks as needed. Calls for the same
/// namespace are not serialized in-process; like calls from other processes,
/// they are reconciled by the store's conditional update.
///
/// # Example
/// ```
/// use nsid::{Allocator, MemoryStore, RegistryKey};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> nsid::Result<()> {
/// let key = RegistryKey::new("namespace-id", "system").unwrap();
/// let allocator = Allocator::new(Arc::new(MemoryStore::new()), key);
/// let cancel = CancellationToken::new();
///
/// let id = allocator.get_or_allocate(&cancel, "team-a").await?;
/// assert_eq!(allocator.get_or_allocate(&cancel, "team-a").await?, id);
///
/// allocator.delete(&cancel, "team-a").await?;
/// assert!(allocator.entries(&cancel).await?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Allocator<S> {
    store: Arc<S>,
    key: RegistryKey,
    driver: RetryDriver,
    id_source: IdSource,
}

impl<S> Clone for Allocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            driver: self.driver.clone(),
            id_source: Arc::clone(&self.id_source),
        }
    }
}

impl<S> fmt::Debug for Allocator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("key", &self.key)
            .field("policy", self.driver.policy())
            .finish_non_exhaustive()
    }
}

impl<S> Allocator<S>
where
    S: DocumentStore,
{
    /// Creates an allocator over the document at `key`, using the default
    /// [`BackoffPolicy`] and [`generate`] for new identifiers.
    pub fn new(store: Arc<S>, key: RegistryKey) -> Self {
        Self {
            store,
            key,
            driver: RetryDriver::default(),
            id_source: Arc::new(generate),
        }
    }

    /// Replaces the backoff policy used when updates conflict.
    #[must_use]
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.driver = RetryDriver::new(policy);
        self
    }

    /// Replaces the function that produces fresh identifiers.
    ///
    /// Every identifier it returns must be unique; the allocator never checks.
    #[must_use]
    pub fn with_id_source<F>(mut self, id_source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_source = Arc::new(id_source);
        self
    }

    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the identifier recorded for `namespace`, allocating and
    /// committing a new one if there is none.
    ///
    /// A committed identifier is returned as-is on every later call. When
    /// several callers race on a fresh namespace exactly one identifier is
    /// committed and all of them return it.
    ///
    /// # Errors
    /// - [`Error::InvalidNamespace`] if `namespace` is empty
    /// - [`Error::Store`] on a permanent store failure (no retry)
    /// - [`Error::Contended`] if conflicts outlast the backoff policy
    /// - [`Error::Cancelled`] if `cancel` fires first
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, cancel), fields(registry = %self.key))
    )]
    pub async fn get_or_allocate(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<String> {
        validate_namespace(namespace)?;
        self.driver
            .retry(cancel, || self.try_get_or_allocate(namespace))
            .await
            .map_err(|e| Error::from_retry(&self.key, namespace, e))
    }

    /// Records `id` for `namespace`, replacing whatever was there.
    ///
    /// This deliberately bypasses generation and is meant for environments
    /// that need deterministic identifiers. If the entry already holds `id`
    /// nothing is written.
    ///
    /// # Errors
    /// As for [`Self::get_or_allocate`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, cancel), fields(registry = %self.key))
    )]
    pub async fn force_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        id: &str,
    ) -> Result<()> {
        validate_namespace(namespace)?;
        self.driver
            .retry(cancel, || self.try_force_set(namespace, id))
            .await
            .map_err(|e| Error::from_retry(&self.key, namespace, e))
    }

    /// Removes the entry for `namespace`, if any.
    ///
    /// Deleting a namespace that has no entry succeeds without writing, as
    /// does deleting from an empty registry.
    ///
    /// # Errors
    /// As for [`Self::get_or_allocate`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, cancel), fields(registry = %self.key))
    )]
    pub async fn delete(&self, cancel: &CancellationToken, namespace: &str) -> Result<()> {
        validate_namespace(namespace)?;
        self.driver
            .retry(cancel, || self.try_delete(namespace))
            .await
            .map_err(|e| Error::from_retry(&self.key, namespace, e))
    }

    /// Returns a snapshot of every recorded namespace and its identifier.
    ///
    /// The registry document is created if it does not exist yet; nothing else
    /// is written.
    ///
    /// # Errors
    /// As for [`Self::get_or_allocate`], reported against namespace `*`.
    pub async fn entries(&self, cancel: &CancellationToken) -> Result<BTreeMap<String, String>> {
        self.driver
            .retry(cancel, || async {
                self.store
                    .create_if_absent(&self.key)
                    .await
                    .map(Document::into_entries)
            })
            .await
            .map_err(|e| Error::from_retry(&self.key, "*", e))
    }

    /// Runs `request`, returning the identifier for
    /// [`AllocationRequest::GetOrAllocate`] and `None` otherwise.
    ///
    /// # Errors
    /// As for the operation the request names.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &AllocationRequest,
    ) -> Result<Option<String>> {
        match request {
            AllocationRequest::GetOrAllocate { namespace } => {
                self.get_or_allocate(cancel, namespace).await.map(Some)
            }
            AllocationRequest::ForceSet { namespace, id } => {
                self.force_set(cancel, namespace, id).await.map(|()| None)
            }
            AllocationRequest::Delete { namespace } => {
                self.delete(cancel, namespace).await.map(|()| None)
            }
        }
    }

    async fn try_get_or_allocate(&self, namespace: &str) -> Result<String, StoreError> {
        let mut document = self.store.create_if_absent(&self.key).await?;
        if let Some(existing) = document.get(namespace) {
            return Ok(existing.to_owned());
        }

        let id = (self.id_source)();
        document.insert(namespace, id.as_str());
        self.store.update(&document).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(namespace, id = %id, version = %document.version().next(), "allocated identifier");
        Ok(id)
    }

    async fn try_force_set(&self, namespace: &str, id: &str) -> Result<(), StoreError> {
        let mut document = self.store.create_if_absent(&self.key).await?;
        if document.get(namespace) == Some(id) {
            return Ok(());
        }

        let _previous = document.insert(namespace, id);
        self.store.update(&document).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(namespace, id, previous = ?_previous, "pinned identifier");
        Ok(())
    }

    async fn try_delete(&self, namespace: &str) -> Result<(), StoreError> {
        let mut document = self.store.create_if_absent(&self.key).await?;
        if document.is_empty() {
            return Ok(());
        }
        let Some(_removed) = document.remove(namespace) else {
            return Ok(());
        };
        self.store.update(&document).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(namespace, id = %_removed, "deleted identifier");
        Ok(())
    }
}

fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::InvalidNamespace {
            reason: "namespace must not be empty".to_owned(),
        });
    }
    Ok(())
}
