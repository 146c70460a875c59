//! Core governance engine. Runs proposals from creation through voting to finalization.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount, BlockHeight, ChainParams, FRACTION_SCALE};

use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::params::ProposalTopic;
use crate::proposal::{Proposal, ProposalChange, ProposalId, ProposalStatus};
use crate::view::StakeView;

/// Voted stake as a fixed-point fraction of total staked value, truncated.
///
/// The product is taken in 256 bits so any pair of `u128` amounts is exact.
/// Zero total stake yields a zero ratio.
pub fn quorum_ratio(voted: Amount, total: Amount) -> Result<u128, GovernanceError> {
    if total.is_zero() {
        return Ok(0);
    }
    let ratio = U256::from(voted.raw()) * U256::from(FRACTION_SCALE) / U256::from(total.raw());
    if ratio.bits() > 128 {
        return Err(GovernanceError::Overflow);
    }
    Ok(ratio.low_u128())
}

/// Outcome of a tally: passing preempts the window, failing waits for it.
fn decide(
    voted: Amount,
    total: Amount,
    quorum: u64,
    expired: bool,
) -> Result<ProposalStatus, GovernanceError> {
    if quorum_ratio(voted, total)? >= u128::from(quorum) {
        Ok(ProposalStatus::Passed)
    } else if expired {
        Ok(ProposalStatus::Failed)
    } else {
        Ok(ProposalStatus::Open)
    }
}

/// Serializable proposal log plus the parameters governing it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub params: ChainParams,
    pub proposals: Vec<Proposal>,
}

/// Append-only proposal log with stake-weighted voting.
///
/// Stake is read through a [`StakeView`] at the moment of each call and never
/// snapshotted at proposal creation. Committed changes queue a
/// [`GovernanceEvent`] that the owner collects with
/// [`drain_events`](Self::drain_events) once it no longer holds the engine.
pub struct GovernanceEngine {
    params: ChainParams,
    /// Proposal `id` lives at index `id - 1`.
    proposals: Vec<Proposal>,
    pending: Vec<GovernanceEvent>,
}

impl GovernanceEngine {
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            proposals: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Replace the governing parameters, e.g. after a passed proposal was applied.
    /// Affects tallies and windows of proposals created or voted on afterwards.
    pub fn set_params(&mut self, params: ChainParams) {
        self.params = params;
    }

    /// Take every event committed since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.proposals.get(index)
    }

    fn proposal_mut(&mut self, id: ProposalId) -> Result<&mut Proposal, GovernanceError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// `Open` and still inside its voting window.
    pub fn is_proposal_open(&self, id: ProposalId, now: BlockHeight) -> bool {
        self.proposal(id).is_some_and(|p| p.is_open(now))
    }

    pub fn has_voted(&self, id: ProposalId, voter: &Address) -> bool {
        self.proposal(id).is_some_and(|p| p.has_voted(voter))
    }

    /// Propose a new numeric value for `topic`.
    pub fn create_proposal(
        &mut self,
        view: &impl StakeView,
        proposer: &Address,
        topic: ProposalTopic,
        value: u64,
        now: BlockHeight,
    ) -> Result<ProposalId, GovernanceError> {
        if !view.is_validator(proposer) {
            return Err(GovernanceError::NotAValidator(proposer.clone()));
        }
        if topic.takes_address() {
            return Err(GovernanceError::WrongProposalShape(topic));
        }
        if !topic.accepts(value) {
            return Err(GovernanceError::ValueOutOfRange { topic, value });
        }
        Ok(self.open_proposal(proposer, topic, ProposalChange::Value(value), now))
    }

    /// Propose a new address for an address-valued `topic`.
    pub fn create_address_proposal(
        &mut self,
        view: &impl StakeView,
        proposer: &Address,
        topic: ProposalTopic,
        contract: Address,
        now: BlockHeight,
    ) -> Result<ProposalId, GovernanceError> {
        if !view.is_validator(proposer) {
            return Err(GovernanceError::NotAValidator(proposer.clone()));
        }
        if !topic.takes_address() {
            return Err(GovernanceError::WrongProposalShape(topic));
        }
        Ok(self.open_proposal(proposer, topic, ProposalChange::Contract(contract), now))
    }

    fn open_proposal(
        &mut self,
        proposer: &Address,
        topic: ProposalTopic,
        change: ProposalChange,
        now: BlockHeight,
    ) -> ProposalId {
        let id = self.proposal_count() + 1;
        let vote_ends_at = now.saturating_add(self.params.vote_time_period);
        self.proposals.push(Proposal {
            id,
            proposer: proposer.clone(),
            topic,
            change: change.clone(),
            vote_starts_at: now,
            vote_ends_at,
            voters: Default::default(),
            voted_stake: Amount::ZERO,
            status: ProposalStatus::Open,
        });
        tracing::info!(id, %proposer, topic = topic.name(), %vote_ends_at, "proposal created");
        self.pending.push(GovernanceEvent::ProposalCreated {
            id,
            proposer: proposer.clone(),
            topic,
            change,
            vote_ends_at,
        });
        id
    }

    /// Cast `voter`'s current stake for proposal `id`, then tally.
    ///
    /// A vote arriving once the window has closed is not counted, but still
    /// finalizes the proposal. Returns the status after tallying.
    pub fn vote_on_proposal(
        &mut self,
        view: &impl StakeView,
        voter: &Address,
        id: ProposalId,
        now: BlockHeight,
    ) -> Result<ProposalStatus, GovernanceError> {
        if !view.is_validator(voter) {
            return Err(GovernanceError::NotAValidator(voter.clone()));
        }
        let quorum = self.params.vote_quorum;
        let total = view.total_staked();
        let proposal = self.proposal_mut(id)?;
        if proposal.status != ProposalStatus::Open {
            return Err(GovernanceError::ProposalNotOpen(id));
        }
        if proposal.has_voted(voter) {
            return Err(GovernanceError::DuplicateVote {
                id,
                voter: voter.clone(),
            });
        }

        let expired = proposal.has_expired(now);
        let stake = if expired {
            Amount::ZERO
        } else {
            view.stake_of(voter)
        };
        let voted_stake = proposal
            .voted_stake
            .checked_add(stake)
            .ok_or(GovernanceError::Overflow)?;
        let status = decide(voted_stake, total, quorum, expired)?;

        let mut events = Vec::with_capacity(2);
        if !expired {
            proposal.voted_stake = voted_stake;
            proposal.voters.insert(voter.clone());
            tracing::debug!(id, %voter, %stake, %voted_stake, "vote cast");
            events.push(GovernanceEvent::VoteCast {
                id,
                voter: voter.clone(),
                stake,
            });
        }
        if status != ProposalStatus::Open {
            proposal.status = status;
            tracing::info!(id, ?status, %voted_stake, %total, "proposal finalized");
            events.push(GovernanceEvent::ProposalFinalized { id, status });
        }
        self.pending.extend(events);
        Ok(status)
    }

    /// Tally proposal `id` without voting. Terminal proposals are returned as-is.
    pub fn finalize(
        &mut self,
        view: &impl StakeView,
        id: ProposalId,
        now: BlockHeight,
    ) -> Result<ProposalStatus, GovernanceError> {
        let quorum = self.params.vote_quorum;
        let total = view.total_staked();
        let proposal = self.proposal_mut(id)?;
        if proposal.status != ProposalStatus::Open {
            return Ok(proposal.status);
        }
        let status = decide(proposal.voted_stake, total, quorum, proposal.has_expired(now))?;
        if status != ProposalStatus::Open {
            proposal.status = status;
            tracing::info!(id, ?status, voted_stake = %proposal.voted_stake, %total, "proposal finalized");
            self.pending
                .push(GovernanceEvent::ProposalFinalized { id, status });
        }
        Ok(status)
    }

    /// Withdraw proposal `id`. Only its proposer may, and only while it is open.
    pub fn cancel_proposal(
        &mut self,
        caller: &Address,
        id: ProposalId,
        now: BlockHeight,
    ) -> Result<(), GovernanceError> {
        let proposal = self.proposal_mut(id)?;
        if proposal.proposer != *caller {
            return Err(GovernanceError::NotProposer(id));
        }
        if !proposal.is_open(now) {
            return Err(GovernanceError::ProposalNotOpen(id));
        }
        proposal.status = ProposalStatus::Cancelled;
        tracing::info!(id, proposer = %caller, "proposal cancelled");
        self.pending.push(GovernanceEvent::ProposalCancelled { id });
        Ok(())
    }

    /// Serialize the proposal log to bytes for persistence.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        let snapshot = GovernanceSnapshot {
            params: self.params.clone(),
            proposals: self.proposals.clone(),
        };
        bincode::serialize(&snapshot).map_err(|e| GovernanceError::CorruptState(e.to_string()))
    }

    /// Restore the proposal log from serialized bytes.
    pub fn load_state(data: &[u8]) -> Result<Self, GovernanceError> {
        let snapshot: GovernanceSnapshot =
            bincode::deserialize(data).map_err(|e| GovernanceError::CorruptState(e.to_string()))?;
        for (index, proposal) in snapshot.proposals.iter().enumerate() {
            if proposal.id != index as u64 + 1 {
                return Err(GovernanceError::CorruptState(format!(
                    "proposal at position {} has id {}",
                    index + 1,
                    proposal.id
                )));
            }
            if proposal.status == ProposalStatus::Closed {
                return Err(GovernanceError::CorruptState(format!(
                    "proposal {} is stored as closed",
                    proposal.id
                )));
            }
        }
        Ok(Self {
            params: snapshot.params,
            proposals: snapshot.proposals,
            pending: Vec::new(),
        })
    }
}
