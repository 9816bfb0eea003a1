use crate::{Document, RegistryKey, StoreError};
use core::future::Future;

/// A remote key/value document store with optimistic concurrency.
///
/// Implementations classify every failure exactly once, at this boundary:
/// [`StoreError::Conflict`] when a conditional update lost a race, and a
/// permanent error for everything else. Callers never re-interpret an error's
/// retryability.
pub trait DocumentStore: Send + Sync {
    /// Returns the document stored at `key`, creating an empty one first if
    /// none exists.
    ///
    /// The caller cannot tell whether the document was created by this call
    /// or already existed; either way the returned snapshot carries the
    /// version to pass back to [`Self::update`].
    ///
    /// # Errors
    /// Any failure other than "already exists" is permanent.
    fn create_if_absent(
        &self,
        key: &RegistryKey,
    ) -> impl Future<Output = Result<Document, StoreError>> + Send;

    /// Returns the current document stored at `key` and its version.
    ///
    /// # Errors
    /// A missing document is a permanent [`PermanentKind::NotFound`] error.
    ///
    /// [`PermanentKind::NotFound`]: crate::PermanentKind::NotFound
    fn fetch(&self, key: &RegistryKey)
    -> impl Future<Output = Result<Document, StoreError>> + Send;

    /// Writes `document` back if, and only if, the stored version still equals
    /// [`Document::version`]. On success the stored version advances.
    ///
    /// # Errors
    /// - [`StoreError::Conflict`] if another writer committed since the
    ///   document was read
    /// - a permanent error for any other failure; the stored document is left
    ///   untouched
    fn update(&self, document: &Document) -> impl Future<Output = Result<(), StoreError>> + Send;
}
