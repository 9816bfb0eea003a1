//! Retrying operations that fail with retryable errors.
//!
//! [`RetryDriver`] re-runs an operation under a [`BackoffPolicy`] until it
//! succeeds, fails with an error whose [`Retryable::is_retryable`] is `false`,
//! exhausts the policy, or is cancelled.

mod driver;
mod error;
mod policy;

pub use driver::*;
pub use error::*;
pub use policy::*;
