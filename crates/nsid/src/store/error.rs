use crate::{RegistryKey, Retryable};
use core::fmt;

/// Why a store operation failed permanently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermanentKind {
    /// The document does not exist (for example, removed during an update).
    NotFound,
    /// An I/O or transport failure.
    Io,
    /// The document could not be encoded or decoded.
    Serialization,
    /// The encoded document exceeds the store's size ceiling.
    TooLarge,
    /// The stored document uses a format this crate does not understand.
    UnsupportedFormat,
    /// A writer's lock has been held far longer than any update takes; it
    /// was most likely abandoned by a crashed process.
    StaleLock,
}

impl fmt::Display for PermanentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::Io => "i/o error",
            Self::Serialization => "serialization error",
            Self::TooLarge => "document too large",
            Self::UnsupportedFormat => "unsupported format",
            Self::StaleLock => "stale lock",
        })
    }
}

/// Errors reported by a [`DocumentStore`].
///
/// Every failure is classified here, once: [`StoreError::Conflict`] is the
/// only retryable case.
///
/// [`DocumentStore`]: crate::DocumentStore
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The document changed between read and conditional update.
    #[error("registry '{key}' was modified concurrently")]
    Conflict { key: RegistryKey },

    /// Any failure other than a version mismatch.
    #[error("registry '{key}': {kind}: {reason}")]
    Permanent {
        key: RegistryKey,
        kind: PermanentKind,
        reason: String,
    },

    /// The registry key itself is malformed.
    #[error("invalid registry key: {reason}")]
    InvalidKey { reason: String },
}

impl StoreError {
    pub(crate) fn permanent(key: &RegistryKey, kind: PermanentKind, reason: impl fmt::Display) -> Self {
        Self::Permanent {
            key: key.clone(),
            kind,
            reason: reason.to_string(),
        }
    }

    /// Classifies an I/O error, keeping "not found" distinguishable.
    pub(crate) fn io(key: &RegistryKey, err: &std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            PermanentKind::NotFound
        } else {
            PermanentKind::Io
        };
        Self::permanent(key, kind, err)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The permanent failure kind, if this is a [`StoreError::Permanent`].
    pub fn kind(&self) -> Option<PermanentKind> {
        match self {
            Self::Permanent { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}
