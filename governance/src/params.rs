//! Parameters a proposal can target.

use serde::{Deserialize, Serialize};
use stakereg_types::params::is_fraction;

/// The chain parameter a proposal changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalTopic {
    /// Fraction of stake slashed per penalty.
    Penalty,
    /// Blocks per slot.
    SlotSize,
    /// Slots per epoch.
    EpochSize,
    /// Fraction of total staked value required to pass a proposal.
    VoteQuorum,
    /// Address of the registry consensus reads from. Takes an address, not a number.
    RegistryAddress,
}

impl ProposalTopic {
    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Penalty => "penalty",
            Self::SlotSize => "slot_size",
            Self::EpochSize => "epoch_size",
            Self::VoteQuorum => "vote_quorum",
            Self::RegistryAddress => "registry_address",
        }
    }

    /// Whether this topic carries an address rather than a number.
    pub fn takes_address(&self) -> bool {
        matches!(self, Self::RegistryAddress)
    }

    /// Whether `value` is legal for this numeric topic.
    pub fn accepts(&self, value: u64) -> bool {
        match self {
            Self::Penalty | Self::VoteQuorum => is_fraction(value),
            Self::SlotSize | Self::EpochSize => value > 0,
            Self::RegistryAddress => false,
        }
    }
}
