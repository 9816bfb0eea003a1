mod namespace_id;

pub use namespace_id::*;
