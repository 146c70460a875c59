use stakereg_types::{Address, Amount, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("{0} is not a validator")]
    NotAValidator(Address),

    #[error("{0} is not a delegator")]
    NotADelegator(Address),

    #[error("{delegator} is not currently delegating to {validator}")]
    NotCurrentlyDelegated { delegator: Address, validator: Address },

    #[error("insufficient stake: requested {requested}, available {available}")]
    InsufficientStake { requested: Amount, available: Amount },

    #[error("insufficient delegation: requested {requested}, available {available}")]
    InsufficientDelegation { requested: Amount, available: Amount },

    #[error("validator {validator} still backs {delegated} of delegated stake")]
    DelegationsOutstanding { validator: Address, delegated: Amount },

    #[error("transfer of {amount} to {to} failed")]
    TransferFailed { to: Address, amount: Amount },

    #[error("another registry operation is already in progress")]
    OperationInProgress,

    #[error("arithmetic overflow in stake accounting")]
    Overflow,

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount => ErrorKind::InvalidArgument,
            Self::NotAValidator(_)
            | Self::NotADelegator(_)
            | Self::NotCurrentlyDelegated { .. }
            | Self::DelegationsOutstanding { .. } => ErrorKind::PreconditionFailed,
            Self::InsufficientStake { .. } | Self::InsufficientDelegation { .. } => {
                ErrorKind::InsufficientBalance
            }
            Self::TransferFailed { .. } => ErrorKind::TransferFailed,
            Self::OperationInProgress => ErrorKind::Conflict,
            Self::Overflow | Self::CorruptSnapshot(_) => ErrorKind::Internal,
        }
    }
}
