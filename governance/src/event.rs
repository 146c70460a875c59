//! Governance events published after each committed state change.

use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount, BlockHeight};

use crate::params::ProposalTopic;
use crate::proposal::{ProposalChange, ProposalId, ProposalStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    ProposalCreated {
        id: ProposalId,
        proposer: Address,
        topic: ProposalTopic,
        change: ProposalChange,
        vote_ends_at: BlockHeight,
    },
    VoteCast {
        id: ProposalId,
        voter: Address,
        stake: Amount,
    },
    /// The proposal reached `Passed` or `Failed`.
    ProposalFinalized { id: ProposalId, status: ProposalStatus },
    ProposalCancelled { id: ProposalId },
}
