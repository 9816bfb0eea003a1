#![doc = include_str!("../README.md")]

mod allocator;
mod base32;
mod error;
mod generator;
mod id;
mod rand;
mod retry;
mod store;
mod time;

pub use crate::allocator::*;
pub use crate::base32::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::rand::*;
pub use crate::retry::*;
pub use crate::store::*;
pub use crate::time::*;
