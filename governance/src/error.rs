use stakereg_types::{Address, ErrorKind};
use thiserror::Error;

use crate::params::ProposalTopic;
use crate::proposal::ProposalId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("{0} is not a validator")]
    NotAValidator(Address),

    #[error("value {value} is out of range for {}", .topic.name())]
    ValueOutOfRange { topic: ProposalTopic, value: u64 },

    #[error("{} proposals take a different kind of value", .0.name())]
    WrongProposalShape(ProposalTopic),

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} is not open for voting")]
    ProposalNotOpen(ProposalId),

    #[error("validator {voter} has already voted on proposal {id}")]
    DuplicateVote { id: ProposalId, voter: Address },

    #[error("only the proposer can cancel proposal {0}")]
    NotProposer(ProposalId),

    #[error("arithmetic overflow in vote tally")]
    Overflow,

    #[error("corrupt governance state: {0}")]
    CorruptState(String),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAValidator(_) | Self::NotProposer(_) => ErrorKind::Unauthorized,
            Self::ValueOutOfRange { .. } | Self::WrongProposalShape(_) => ErrorKind::InvalidArgument,
            Self::ProposalNotFound(_) | Self::ProposalNotOpen(_) => ErrorKind::PreconditionFailed,
            Self::DuplicateVote { .. } => ErrorKind::DuplicateVote,
            Self::Overflow | Self::CorruptState(_) => ErrorKind::Internal,
        }
    }
}
