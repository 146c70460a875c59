//! Nullable infrastructure for deterministic testing.
//!
//! The registry's external dependencies (block height, value transfer) sit
//! behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never move real value
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod payment;

pub use clock::NullClock;
pub use payment::{NullPayment, Payment};
