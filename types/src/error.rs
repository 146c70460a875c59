//! Error taxonomy shared across crates.

use thiserror::Error;

/// Coarse classification every component error maps onto.
///
/// Callers that only need to decide how to surface a failure (reject the
/// request, report a conflict, alert) match on the kind instead of on the
/// concrete error enum of each crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Zero amounts, out-of-range parameter values, wrong proposal shape.
    InvalidArgument,
    /// Not a validator/delegator, not currently delegated, unknown proposal.
    PreconditionFailed,
    /// Over-withdrawal of stake or delegation.
    InsufficientBalance,
    /// A validator voted twice on the same proposal.
    DuplicateVote,
    /// The payment primitive reported failure.
    TransferFailed,
    /// Caller is not allowed to perform the operation.
    Unauthorized,
    /// A mutating operation was attempted while another one is in progress.
    Conflict,
    /// Arithmetic overflow or corrupt persisted state.
    Internal,
}

/// Errors raised while validating chain parameters and identities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("{name} must be a fraction in (0, 100000], got {value}")]
    FractionOutOfRange { name: &'static str, value: u64 },

    #[error("{name} must be non-zero")]
    Zero { name: &'static str },

    #[error("address must not be empty")]
    EmptyAddress,
}

impl ParamsError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}
