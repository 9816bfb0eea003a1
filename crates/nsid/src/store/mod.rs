//! Versioned registry documents.
//!
//! A [`DocumentStore`] holds one [`Document`] per [`RegistryKey`]. Documents
//! are only ever mutated through a conditional update keyed on the
//! [`Version`] they were read with, so concurrent writers never silently
//! overwrite each other: the loser observes [`StoreError::Conflict`] and must
//! re-read.
//!
//! ## Implementations
//!
//! - [`MemoryStore`] - in-process, for tests and single-process deployments
//! - [`FileStore`] - a directory on a (possibly shared) filesystem

mod document;
mod error;
mod file;
mod interface;
mod memory;

pub use document::*;
pub use error::*;
pub use file::*;
pub use interface::*;
pub use memory::*;
