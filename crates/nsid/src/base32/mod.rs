mod crockford;
mod error;

pub(crate) use crockford::*;
pub use error::*;
