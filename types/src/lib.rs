//! Fundamental types for the stake registry.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! participant addresses, stake amounts, block heights, chain parameters, and the
//! error taxonomy every component error maps onto.

pub mod address;
pub mod amount;
pub mod error;
pub mod params;
pub mod time;

pub use address::Address;
pub use amount::{Amount, UNIT};
pub use error::{ErrorKind, ParamsError};
pub use params::{ChainParams, FRACTION_SCALE};
pub use time::{BlockHeight, Clock};
