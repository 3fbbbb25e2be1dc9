#![doc = include_str!("../README.md")]

mod channel;
mod counter;
mod error;
mod factory;
mod pool;
mod worker;

pub use crate::channel::*;
pub use crate::counter::*;
pub use crate::error::*;
pub use crate::factory::*;
pub use crate::pool::*;
pub use crate::worker::*;
