use crate::{
    DEFAULT_MAX_DOCUMENT_BYTES, Document, DocumentStore, PermanentKind, RegistryKey, StoreError,
};
use core::time::Duration;
use rand::{Rng, rng};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// How long a writer's lock may exist before it is considered abandoned.
pub const DEFAULT_STALE_LOCK_AFTER: Duration = Duration::from_secs(30);

/// A [`DocumentStore`] backed by a directory, safe to share between processes
/// on the same (or a shared) filesystem.
///
/// Each document lives at `<root>/<location>/<name>.json`.
///
/// ## Protocol
///
/// - **Create**: the empty document is written to a temporary file and then
///   hard-linked into place. Linking fails if the document already exists, so
///   exactly one creator wins and readers never observe a partial file.
/// - **Update**: the writer takes `<name>.json.lock` with an exclusive create.
///   While holding it, it re-reads the document, compares versions, writes a
///   temporary file, and renames it over the document. A lock held by another
///   writer is reported as [`StoreError::Conflict`] so the caller backs off and
///   re-reads. A lock older than the stale threshold is reported as a
///   permanent [`PermanentKind::StaleLock`] error; it must be removed by an
///   operator once no writer is running.
///
/// Create and update run to completion on Tokio's blocking pool. Dropping the
/// returned future (for example when the caller is cancelled) does not
/// interrupt them, and the lock and temporary files are removed on every exit
/// path.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
    stale_lock_after: Duration,
}

/// Removes the file at `path` when dropped, unless [`Self::keep`] was called.
#[derive(Debug)]
struct FileGuard {
    path: Option<PathBuf>,
}

impl FileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// The file has been moved or is meant to outlive the guard.
    fn keep(mut self) {
        self.path = None;
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(path = %path.display(), "failed to remove file: {_e}");
            }
        }
    }
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            stale_lock_after: DEFAULT_STALE_LOCK_AFTER,
        }
    }

    /// Overrides the ceiling on a document's encoded size.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Overrides how old a lock must be before it is reported as abandoned.
    #[must_use]
    pub fn with_stale_lock_after(mut self, stale_lock_after: Duration) -> Self {
        self.stale_lock_after = stale_lock_after;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document stored at `key`.
    pub fn document_path(&self, key: &RegistryKey) -> PathBuf {
        self.root
            .join(key.location())
            .join(format!("{}.json", key.name()))
    }

    fn lock_path(&self, key: &RegistryKey) -> PathBuf {
        self.root
            .join(key.location())
            .join(format!("{}.json.lock", key.name()))
    }

    fn temp_path(&self, key: &RegistryKey) -> PathBuf {
        let suffix: u64 = rng().random();
        self.root
            .join(key.location())
            .join(format!(".{}.json.{suffix:016x}.tmp", key.name()))
    }

    /// Runs `op` on the blocking pool. The task keeps running if the returned
    /// future is dropped.
    async fn run_blocking<T, F>(&self, key: &RegistryKey, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(FileStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(|e| StoreError::permanent(key, PermanentKind::Io, e))?
    }

    fn read(&self, key: &RegistryKey) -> Result<Document, StoreError> {
        let bytes = fs::read(self.document_path(key)).map_err(|e| StoreError::io(key, &e))?;
        Document::decode(key, &bytes)
    }

    fn write_temp(&self, key: &RegistryKey, bytes: &[u8]) -> Result<FileGuard, StoreError> {
        let temp = FileGuard::new(self.temp_path(key));
        fs::write(temp.path(), bytes).map_err(|e| StoreError::io(key, &e))?;
        Ok(temp)
    }

    fn acquire_lock(&self, key: &RegistryKey) -> Result<FileGuard, StoreError> {
        let lock = self.lock_path(key);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock)
        {
            Ok(_) => Ok(FileGuard::new(lock)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(self.classify_held_lock(key, &lock))
            }
            Err(e) => Err(StoreError::io(key, &e)),
        }
    }

    fn classify_held_lock(&self, key: &RegistryKey, lock: &Path) -> StoreError {
        let age = match fs::metadata(lock).and_then(|m| m.modified()) {
            Ok(modified) => SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
            // Released between our attempt and this check.
            Err(_) => Duration::ZERO,
        };
        if age > self.stale_lock_after {
            return StoreError::permanent(
                key,
                PermanentKind::StaleLock,
                format!(
                    "{} has been held for {}s; remove it if no writer is running",
                    lock.display(),
                    age.as_secs()
                ),
            );
        }
        StoreError::Conflict { key: key.clone() }
    }

    fn create_blocking(&self, key: &RegistryKey) -> Result<Document, StoreError> {
        match self.read(key) {
            Ok(document) => return Ok(document),
            Err(e) if e.kind() == Some(PermanentKind::NotFound) => {}
            Err(e) => return Err(e),
        }

        fs::create_dir_all(self.root.join(key.location())).map_err(|e| StoreError::io(key, &e))?;

        let document = Document::empty(key.clone());
        let bytes = document.encode_at(document.version())?;
        let temp = self.write_temp(key, &bytes)?;
        match fs::hard_link(temp.path(), self.document_path(key)) {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(registry = %key, "created registry document");
                Ok(document)
            }
            // Another creator won; return whatever it wrote.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => self.read(key),
            Err(e) => Err(StoreError::io(key, &e)),
        }
    }

    fn update_blocking(&self, document: &Document, bytes: &[u8]) -> Result<(), StoreError> {
        let key = document.key();
        let _lock = self.acquire_lock(key)?;

        let current = self.read(key)?;
        if current.version() != document.version() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                registry = %key,
                read = %document.version(),
                stored = %current.version(),
                "conditional update lost a race"
            );
            return Err(StoreError::Conflict { key: key.clone() });
        }

        let temp = self.write_temp(key, bytes)?;
        fs::rename(temp.path(), self.document_path(key)).map_err(|e| StoreError::io(key, &e))?;
        temp.keep();
        Ok(())
    }
}

impl DocumentStore for FileStore {
    async fn create_if_absent(&self, key: &RegistryKey) -> Result<Document, StoreError> {
        let owned = key.clone();
        self.run_blocking(key, move |store| store.create_blocking(&owned))
            .await
    }

    async fn fetch(&self, key: &RegistryKey) -> Result<Document, StoreError> {
        let owned = key.clone();
        self.run_blocking(key, move |store| store.read(&owned)).await
    }

    async fn update(&self, document: &Document) -> Result<(), StoreError> {
        let bytes = document.encode_for_update(self.max_bytes)?;
        let owned = document.clone();
        self.run_blocking(document.key(), move |store| {
            store.update_blocking(&owned, &bytes)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Version;

    fn key() -> RegistryKey {
        RegistryKey::new("namespace-id", "system").unwrap()
    }

    #[tokio::test]
    async fn create_if_absent_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let mut created = store.create_if_absent(&key()).await.unwrap();
        assert_eq!(created.version(), Version::INITIAL);
        created.insert("team-a", "X");
        store.update(&created).await.unwrap();

        let again = store.create_if_absent(&key()).await.unwrap();
        assert_eq!(again.get("team-a"), Some("X"));
        assert_eq!(again.version(), Version::INITIAL.next());
        assert!(store.document_path(&key()).exists());
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let mut a = store.create_if_absent(&key()).await.unwrap();
        let mut b = store.fetch(&key()).await.unwrap();
        a.insert("team-a", "A");
        store.update(&a).await.unwrap();
        b.insert("team-b", "B");

        assert!(store.update(&b).await.unwrap_err().is_conflict());
        let current = store.fetch(&key()).await.unwrap();
        assert_eq!(current.get("team-a"), Some("A"));
        assert_eq!(current.get("team-b"), None);
        assert!(!store.lock_path(&key()).exists());
    }

    #[tokio::test]
    async fn separate_handles_share_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileStore::new(dir.path());
        let reader = FileStore::new(dir.path());

        let mut doc = writer.create_if_absent(&key()).await.unwrap();
        doc.insert("team-a", "A");
        writer.update(&doc).await.unwrap();

        assert_eq!(reader.fetch(&key()).await.unwrap().get("team-a"), Some("A"));
    }

    #[tokio::test]
    async fn held_lock_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let doc = store.create_if_absent(&key()).await.unwrap();

        std::fs::write(store.lock_path(&key()), b"").unwrap();
        assert!(store.update(&doc).await.unwrap_err().is_conflict());

        std::fs::remove_file(store.lock_path(&key())).unwrap();
        store.update(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn abandoned_lock_is_permanent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_stale_lock_after(Duration::ZERO);
        let doc = store.create_if_absent(&key()).await.unwrap();

        std::fs::write(store.lock_path(&key()), b"").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let err = store.update(&doc).await.unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::StaleLock));
    }

    #[tokio::test]
    async fn update_without_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("system")).unwrap();

        let err = store.update(&Document::empty(key())).await.unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::NotFound));
        assert!(!store.lock_path(&key()).exists());
    }

    #[tokio::test]
    async fn unknown_format_is_permanent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("system")).unwrap();
        std::fs::write(
            store.document_path(&key()),
            br#"{"format": 9, "version": 3, "entries": {}}"#,
        )
        .unwrap();

        let err = store.create_if_absent(&key()).await.unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::UnsupportedFormat));
    }

    #[tokio::test]
    async fn oversized_update_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_max_bytes(128);
        let mut doc = store.create_if_absent(&key()).await.unwrap();
        doc.insert("team-a", "x".repeat(256));

        let err = store.update(&doc).await.unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::TooLarge));
        assert!(store.fetch(&key()).await.unwrap().is_empty());
    }

    #[test]
    fn guard_removes_file_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dropped = dir.path().join("dropped");
        let kept = dir.path().join("kept");
        std::fs::write(&dropped, b"").unwrap();
        std::fs::write(&kept, b"").unwrap();

        drop(FileGuard::new(dropped.clone()));
        FileGuard::new(kept.clone()).keep();
        // Already gone is not an error.
        drop(FileGuard::new(dir.path().join("missing")));

        assert!(!dropped.exists());
        assert!(kept.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropped_update_still_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut doc = store.create_if_absent(&key()).await.unwrap();
        doc.insert("team-a", "A");

        // Polled once, then dropped while the write may still be running.
        let _ = tokio::time::timeout(Duration::ZERO, store.update(&doc)).await;

        let lock = store.lock_path(&key());
        for _ in 0..500 {
            if !lock.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!lock.exists());

        let mut current = store.fetch(&key()).await.unwrap();
        current.insert("team-b", "B");
        store.update(&current).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("system"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "namespace-id.json")
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
