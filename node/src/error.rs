use stakereg_types::{ErrorKind, ParamsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("registry error: {0}")]
    Registry(#[from] stakereg_ledger::RegistryError),

    #[error("governance error: {0}")]
    Governance(#[from] stakereg_governance::GovernanceError),

    #[error("invalid chain parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("config error: {0}")]
    Config(String),

    #[error("corrupt node state: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Registry(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Params(e) => e.kind(),
            Self::Config(_) => ErrorKind::InvalidArgument,
            Self::State(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }
}
