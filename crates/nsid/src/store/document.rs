use crate::{PermanentKind, StoreError};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// The document format written by this crate.
///
/// Readers reject any other value rather than guessing at its shape.
pub const FORMAT_VERSION: u32 = 1;

/// Default ceiling on the encoded size of a document: 1 MiB.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// Identifies exactly one registry document: a `name` within a `location`.
///
/// Every allocator that must agree on identifiers has to be configured with
/// the same key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryKey {
    name: String,
    location: String,
}

impl RegistryKey {
    /// Creates a key after validating both parts.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidKey`] if either part is empty, is `.` or
    /// `..`, or contains a path separator.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let location = location.into();
        validate_part("name", &name)?;
        validate_part("location", &location)?;
        Ok(Self { name, location })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

fn validate_part(part: &str, value: &str) -> Result<(), StoreError> {
    let reason = if value.is_empty() {
        format!("{part} must not be empty")
    } else if value == "." || value == ".." {
        format!("{part} must not be {value:?}")
    } else if value.contains(['/', '\\']) {
        format!("{part} {value:?} must not contain a path separator")
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey { reason })
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location, self.name)
    }
}

/// Opaque version token bound to a document snapshot.
///
/// A freshly created document is at [`Version::INITIAL`]; each committed
/// update advances it by one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Self = Self(1);

    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version a successful update produces.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A snapshot of the registry: namespace name to identifier, plus the version
/// the snapshot was read at.
///
/// Mutating a `Document` only changes the local copy; nothing is persisted
/// until it is passed to [`DocumentStore::update`].
///
/// [`DocumentStore::update`]: crate::DocumentStore::update
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    key: RegistryKey,
    entries: BTreeMap<String, String>,
    version: Version,
}

impl Document {
    pub fn new(key: RegistryKey, entries: BTreeMap<String, String>, version: Version) -> Self {
        Self {
            key,
            entries,
            version,
        }
    }

    /// An empty document at [`Version::INITIAL`].
    pub fn empty(key: RegistryKey) -> Self {
        Self::new(key, BTreeMap::new(), Version::INITIAL)
    }

    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, String> {
        self.entries
    }

    /// Returns the identifier recorded for `namespace`.
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.entries.get(namespace).map(String::as_str)
    }

    /// Records `id` for `namespace`, returning the previous identifier.
    pub fn insert(&mut self, namespace: impl Into<String>, id: impl Into<String>) -> Option<String> {
        self.entries.insert(namespace.into(), id.into())
    }

    /// Removes `namespace`, returning its identifier if it had one.
    pub fn remove(&mut self, namespace: &str) -> Option<String> {
        self.entries.remove(namespace)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the entries as they would be stored at `version`.
    pub(crate) fn encode_at(&self, version: Version) -> Result<Vec<u8>, StoreError> {
        let encoded = EncodedDocument {
            format: FORMAT_VERSION,
            version,
            entries: &self.entries,
        };
        serde_json::to_vec_pretty(&encoded)
            .map_err(|e| StoreError::permanent(&self.key, PermanentKind::Serialization, e))
    }

    /// Serializes the entries as a successful update would store them, and
    /// enforces the size ceiling.
    pub(crate) fn encode_for_update(&self, max_bytes: usize) -> Result<Vec<u8>, StoreError> {
        let bytes = self.encode_at(self.version.next())?;
        if bytes.len() > max_bytes {
            return Err(StoreError::permanent(
                &self.key,
                PermanentKind::TooLarge,
                format!(
                    "encoded document is {} bytes, limit is {max_bytes}",
                    bytes.len()
                ),
            ));
        }
        Ok(bytes)
    }

    /// Parses a stored document. Unknown formats are rejected.
    pub(crate) fn decode(key: &RegistryKey, bytes: &[u8]) -> Result<Self, StoreError> {
        let probe: FormatProbe = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::permanent(key, PermanentKind::Serialization, e))?;
        if probe.format != FORMAT_VERSION {
            return Err(StoreError::permanent(
                key,
                PermanentKind::UnsupportedFormat,
                format!(
                    "document format {} is not supported (expected {FORMAT_VERSION})",
                    probe.format
                ),
            ));
        }
        let decoded: DecodedDocument = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::permanent(key, PermanentKind::Serialization, e))?;
        Ok(Self::new(key.clone(), decoded.entries, decoded.version))
    }
}

#[derive(Serialize)]
struct EncodedDocument<'a> {
    format: u32,
    version: Version,
    entries: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct FormatProbe {
    format: u32,
}

#[derive(Deserialize)]
struct DecodedDocument {
    version: Version,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RegistryKey {
        RegistryKey::new("namespace-id", "system").unwrap()
    }

    #[test]
    fn key_rejects_unsafe_parts() {
        for (name, location) in [
            ("", "system"),
            ("ids", ""),
            ("..", "system"),
            ("ids", "."),
            ("a/b", "system"),
            ("ids", "c\\d"),
        ] {
            assert!(
                matches!(
                    RegistryKey::new(name, location),
                    Err(StoreError::InvalidKey { .. })
                ),
                "{name:?} in {location:?} should be rejected"
            );
        }
    }

    #[test]
    fn key_displays_location_then_name() {
        assert_eq!(key().to_string(), "system/namespace-id");
    }

    #[test]
    fn mutations_stay_local_to_the_snapshot() {
        let mut doc = Document::empty(key());
        assert!(doc.is_empty());
        assert_eq!(doc.insert("team-a", "X"), None);
        assert_eq!(doc.insert("team-a", "Y"), Some("X".to_owned()));
        assert_eq!(doc.get("team-a"), Some("Y"));
        assert_eq!(doc.remove("team-a"), Some("Y".to_owned()));
        assert_eq!(doc.remove("team-a"), None);
        assert_eq!(doc.version(), Version::INITIAL);
    }

    #[test]
    fn decode_reads_what_encode_writes() {
        let mut doc = Document::empty(key());
        doc.insert("team-a", "0123456789ABCDEFGHJK");
        let bytes = doc.encode_at(Version::new(7)).unwrap();
        let decoded = Document::decode(&key(), &bytes).unwrap();
        assert_eq!(decoded.version(), Version::new(7));
        assert_eq!(decoded.entries(), doc.entries());
    }

    #[test]
    fn decode_rejects_unknown_format() {
        let bytes = br#"{"format": 2, "version": 1, "entries": {}}"#;
        let err = Document::decode(&key(), bytes).unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::UnsupportedFormat));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = Document::decode(&key(), b"not json").unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::Serialization));
    }

    #[test]
    fn update_encoding_enforces_size_ceiling() {
        let mut doc = Document::empty(key());
        doc.insert("team-a", "x".repeat(256));
        let err = doc.encode_for_update(128).unwrap_err();
        assert_eq!(err.kind(), Some(PermanentKind::TooLarge));
        assert!(doc.encode_for_update(DEFAULT_MAX_DOCUMENT_BYTES).is_ok());
    }
}
