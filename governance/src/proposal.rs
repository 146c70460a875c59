//! Governance proposals and their lifecycle.

use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount, BlockHeight};
use std::collections::BTreeSet;

use crate::params::ProposalTopic;

/// Sequential proposal id. The first proposal is 1; 0 never names a proposal.
pub type ProposalId = u64;

/// Where a proposal is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Default before creation; never stored on a live proposal.
    #[default]
    Closed,
    /// Accepting votes.
    Open,
    /// Quorum reached.
    Passed,
    /// Window closed without quorum.
    Failed,
    /// Withdrawn by the proposer.
    Cancelled,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Cancelled)
    }
}

/// The new value a proposal sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalChange {
    Value(u64),
    Contract(Address),
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub topic: ProposalTopic,
    pub change: ProposalChange,
    /// First height at which votes are accepted.
    pub vote_starts_at: BlockHeight,
    /// First height at which votes are no longer accepted.
    pub vote_ends_at: BlockHeight,
    /// Validators that already voted.
    pub voters: BTreeSet<Address>,
    /// Stake of every voter, read when they voted.
    pub voted_stake: Amount,
    pub status: ProposalStatus,
}

impl Proposal {
    /// `Open` and inside the half-open window `[vote_starts_at, vote_ends_at)`.
    pub fn is_open(&self, now: BlockHeight) -> bool {
        self.status == ProposalStatus::Open && !self.has_expired(now)
    }

    pub fn has_expired(&self, now: BlockHeight) -> bool {
        self.vote_ends_at.is_reached(now)
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }
}
