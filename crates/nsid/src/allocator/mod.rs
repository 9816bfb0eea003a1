//! The namespace identifier allocator.
//!
//! [`Allocator`] maps namespace names to identifiers stored in a single
//! registry [`Document`](crate::Document). Every operation is one
//! read-modify-write cycle driven by a [`RetryDriver`](crate::RetryDriver):
//! fetch (or create) the document, inspect or change the mapping, and commit
//! with a conditional update. A cycle that loses a race starts over from the
//! fetch, so a concurrent winner's entry is always observed before anything is
//! generated or overwritten.

mod registry;
mod request;

pub use registry::*;
pub use request::*;
