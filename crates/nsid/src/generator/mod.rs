mod discriminator;
mod global;
mod namespace;

pub use discriminator::*;
pub use global::*;
pub use namespace::*;
