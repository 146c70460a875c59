//! Registry events published to observers after each committed mutation.

use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount};

/// A committed change to validator or delegator membership or stake.
///
/// Each variant carries the affected identities and the exact delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// First deposit by an address that was not a validator.
    ValidatorAdded { validator: Address, amount: Amount },
    /// Withdrawal that drained the validator's stake to zero.
    ValidatorRemoved { validator: Address, amount: Amount },
    ValidatorIncreasedStake { validator: Address, amount: Amount },
    ValidatorDecreasedStake { validator: Address, amount: Amount },
    /// First delegation from `delegator` to `validator`.
    DelegatorAdded {
        delegator: Address,
        validator: Address,
        amount: Amount,
    },
    /// Withdrawal that drained the allocation from `delegator` to `validator`.
    DelegatorRemoved {
        delegator: Address,
        validator: Address,
        amount: Amount,
    },
    DelegatorIncreasedStake {
        delegator: Address,
        validator: Address,
        amount: Amount,
    },
    DelegatorDecreasedStake {
        delegator: Address,
        validator: Address,
        amount: Amount,
    },
}

impl RegistryEvent {
    /// The amount moved by this event.
    pub fn amount(&self) -> Amount {
        match self {
            Self::ValidatorAdded { amount, .. }
            | Self::ValidatorRemoved { amount, .. }
            | Self::ValidatorIncreasedStake { amount, .. }
            | Self::ValidatorDecreasedStake { amount, .. }
            | Self::DelegatorAdded { amount, .. }
            | Self::DelegatorRemoved { amount, .. }
            | Self::DelegatorIncreasedStake { amount, .. }
            | Self::DelegatorDecreasedStake { amount, .. } => *amount,
        }
    }
}
