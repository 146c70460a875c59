//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use stakereg_types::ChainParams;
use stakereg_utils::{init_logging, LogFormat};

use crate::NodeError;

/// Configuration for a stake registry node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Initial chain parameters. Governance may change them afterwards.
    #[serde(default)]
    pub params: ChainParams,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Install the global log subscriber this config describes.
    ///
    /// A subscriber installed earlier in the process is left in place.
    pub fn init_logging(&self) {
        if !init_logging(self.log_format, &self.log_level) {
            tracing::debug!("log subscriber already installed");
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            params: ChainParams::default(),
        }
    }
}
