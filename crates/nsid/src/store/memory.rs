use crate::{
    DEFAULT_MAX_DOCUMENT_BYTES, Document, DocumentStore, PermanentKind, RegistryKey, StoreError,
    Version,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct Stored {
    entries: BTreeMap<String, String>,
    version: Version,
}

/// An in-process [`DocumentStore`].
///
/// All documents live behind one mutex; the lock is never held across an
/// `.await`. Share it between allocators with an `Arc`.
#[derive(Debug)]
pub struct MemoryStore {
    documents: Mutex<HashMap<RegistryKey, Stored>>,
    max_bytes: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            max_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Overrides the ceiling on a document's encoded size.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    async fn create_if_absent(&self, key: &RegistryKey) -> Result<Document, StoreError> {
        let mut documents = self.documents.lock();
        let stored = documents.entry(key.clone()).or_insert_with(|| {
            #[cfg(feature = "tracing")]
            tracing::debug!(registry = %key, "created registry document");
            Stored {
                entries: BTreeMap::new(),
                version: Version::INITIAL,
            }
        });
        Ok(Document::new(
            key.clone(),
            stored.entries.clone(),
            stored.version,
        ))
    }

    async fn fetch(&self, key: &RegistryKey) -> Result<Document, StoreError> {
        let documents = self.documents.lock();
        let stored = documents.get(key).ok_or_else(|| {
            StoreError::permanent(key, PermanentKind::NotFound, "document does not exist")
        })?;
        Ok(Document::new(
            key.clone(),
            stored.entries.clone(),
            stored.version,
        ))
    }

    async fn update(&self, document: &Document) -> Result<(), StoreError> {
        let key = document.key();
        document.encode_for_update(self.max_bytes)?;

        let mut documents = self.documents.lock();
        let stored = documents.get_mut(key).ok_or_else(|| {
            StoreError::permanent(key, PermanentKind::NotFound, "document does not exist")
        })?;
        if stored.version != document.version() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                registry = %key,
                read = %document.version(),
                stored = %stored.version,
                "conditional update lost a race"
            );
            return Err(StoreError::Conflict { key: key.clone() });
        }
        stored.entries = document.entries().clone();
        stored.version = stored.version.next();
        Ok(())
    }
}
