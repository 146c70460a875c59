//! Stake registry node, the single entry point callers talk to.
//!
//! The node owns the registry and the governance engine, stamps every
//! governance call with the current block height from its [`Clock`], and
//! forwards the caller identity the transport layer authenticated.
//!
//! [`Clock`]: stakereg_types::Clock

pub mod config;
pub mod error;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::StakingNode;
