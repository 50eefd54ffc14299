#![doc = include_str!("../README.md")]

mod error;
mod generator;
mod id;
mod issuer;
#[cfg(feature = "serde")]
pub mod serde;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::issuer::*;
pub use crate::time::*;
