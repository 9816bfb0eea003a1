//! Process-wide identifier generation.
//!
//! # Example
//! ```rust
//! let id = nsid::generate();
//! assert_eq!(id.len(), nsid::NamespaceId::ENCODED_LEN);
//! ```

use crate::{NamespaceId, NamespaceIdGenerator, ThreadRandom, WallClock};
use std::sync::LazyLock;

/// A global generator shared by every thread in the process, so identifiers
/// from different threads never share a counter value.
static GLOBAL_GENERATOR: LazyLock<NamespaceIdGenerator<WallClock>> =
    LazyLock::new(|| NamespaceIdGenerator::new(WallClock, &ThreadRandom));

/// Generates a [`NamespaceId`] from the process-wide generator.
pub fn next_namespace_id() -> NamespaceId {
    GLOBAL_GENERATOR.next_id()
}

/// Generates a new identifier in its textual form.
///
/// Pure from the caller's perspective: no I/O, no coordination, no failure
/// mode.
pub fn generate() -> String {
    next_namespace_id().to_string()
}
