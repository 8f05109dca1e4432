#![doc = include_str!("../README.md")]

mod error;
mod record;
mod store;
mod time;

pub use crate::error::*;
pub use crate::record::*;
pub use crate::store::*;
pub use crate::time::*;
