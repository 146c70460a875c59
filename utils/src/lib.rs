//! Shared utilities for the stake registry.

pub mod events;
pub mod logging;

pub use events::EventBus;
pub use logging::{init_logging, LogFormat};
