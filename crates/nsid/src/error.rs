//! Error types for namespace identifier allocation.
//!
//! ## Error Cases
//! - `Store`: the registry store failed permanently; nothing was retried.
//! - `Contended`: conflicting writers kept winning until the backoff policy
//!   gave up.
//! - `Cancelled`: the caller's cancellation token fired.
//! - `InvalidNamespace`: the namespace name was rejected before any store
//!   access.

use crate::{RegistryKey, RetryError, StoreError};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for [`Allocator`](crate::Allocator) operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A permanent store failure, tagged with the registry and namespace the
    /// operation was working on.
    #[error("registry '{key}', namespace '{namespace}': {source}")]
    Store {
        key: RegistryKey,
        namespace: String,
        source: StoreError,
    },

    /// The retry policy was exhausted while the document kept changing
    /// underneath the operation.
    #[error(
        "registry '{key}', namespace '{namespace}': still conflicting after {attempts} attempts"
    )]
    Contended {
        key: RegistryKey,
        namespace: String,
        attempts: u32,
        #[source]
        last: StoreError,
    },

    /// The caller cancelled the operation.
    #[error("namespace '{namespace}': operation cancelled")]
    Cancelled { namespace: String },

    /// The namespace name is not acceptable.
    #[error("invalid namespace: {reason}")]
    InvalidNamespace { reason: String },
}

impl Error {
    /// Attaches registry and namespace context to the outcome of a retried
    /// store operation.
    pub(crate) fn from_retry(
        key: &RegistryKey,
        namespace: &str,
        err: RetryError<StoreError>,
    ) -> Self {
        match err {
            RetryError::Permanent(source) => Self::Store {
                key: key.clone(),
                namespace: namespace.to_owned(),
                source,
            },
            RetryError::Exhausted { attempts, last } => Self::Contended {
                key: key.clone(),
                namespace: namespace.to_owned(),
                attempts,
                last,
            },
            RetryError::Cancelled => Self::Cancelled {
                namespace: namespace.to_owned(),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Contended { last, .. } => Some(last),
            _ => None,
        }
    }
}
