//! The staking node struct. Wires the registry and governance together.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use stakereg_governance::{
    GovernanceEngine, GovernanceError, GovernanceEvent, Proposal, ProposalId, ProposalStatus,
    ProposalTopic,
};
use stakereg_ledger::{Delegator, PaymentPrimitive, Registry, RegistryEvent, RegistrySnapshot, Validator};
use stakereg_types::{Address, Amount, BlockHeight, ChainParams, Clock};
use stakereg_utils::EventBus;

use crate::config::NodeConfig;
use crate::error::NodeError;

/// Everything a node persists between runs.
#[derive(Serialize, Deserialize)]
struct NodeState {
    registry: RegistrySnapshot,
    governance: Vec<u8>,
}

/// A running stake registry node.
///
/// Every mutating call takes the caller identity as already authenticated by
/// the transport. Governance calls are stamped with `clock.now()`.
///
/// Governance events are published only after the engine lock is released,
/// so listeners may call back into the node.
pub struct StakingNode {
    registry: Arc<Registry>,
    governance: Mutex<GovernanceEngine>,
    governance_events: EventBus<GovernanceEvent>,
    clock: Arc<dyn Clock>,
}

impl StakingNode {
    /// Start a node with an empty registry.
    pub fn new(
        params: ChainParams,
        payments: Arc<dyn PaymentPrimitive>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        params.validate()?;
        tracing::info!(
            vote_quorum = params.vote_quorum,
            vote_time_period = params.vote_time_period,
            "staking node started"
        );
        Ok(Self {
            registry: Arc::new(Registry::new(payments)),
            governance: Mutex::new(GovernanceEngine::new(params)),
            governance_events: EventBus::new(),
            clock,
        })
    }

    pub fn from_config(
        config: &NodeConfig,
        payments: Arc<dyn PaymentPrimitive>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        Self::new(config.params.clone(), payments, clock)
    }

    /// The registry, for collaborators that need to share it.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn now(&self) -> BlockHeight {
        self.clock.now()
    }

    fn governance(&self) -> MutexGuard<'_, GovernanceEngine> {
        self.governance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `op` on the engine, then publish whatever it committed once the
    /// lock is gone.
    fn with_governance<T>(
        &self,
        op: impl FnOnce(&mut GovernanceEngine) -> Result<T, GovernanceError>,
    ) -> Result<T, NodeError> {
        let (result, events) = {
            let mut gov = self.governance();
            let result = op(&mut gov);
            (result, gov.drain_events())
        };
        self.governance_events.emit_all(&events);
        Ok(result?)
    }

    pub fn params(&self) -> ChainParams {
        self.governance().params().clone()
    }

    /// Install new chain parameters, typically after a passed proposal was applied.
    pub fn set_params(&self, params: ChainParams) -> Result<(), NodeError> {
        params.validate()?;
        tracing::info!(
            vote_quorum = params.vote_quorum,
            vote_time_period = params.vote_time_period,
            "chain parameters updated"
        );
        self.governance().set_params(params);
        Ok(())
    }

    pub fn subscribe_registry(&self, listener: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.registry.subscribe(listener);
    }

    pub fn subscribe_governance(
        &self,
        listener: impl Fn(&GovernanceEvent) + Send + Sync + 'static,
    ) {
        self.governance_events.subscribe(listener);
    }

    // ── Registry ─────────────────────────────────────────────────────────

    pub fn deposit_stake(&self, caller: &Address, amount: Amount) -> Result<(), NodeError> {
        Ok(self.registry.deposit_stake(caller, amount)?)
    }

    pub fn withdraw_stake(
        &self,
        caller: &Address,
        amount: Amount,
        pay_to: &Address,
    ) -> Result<(), NodeError> {
        Ok(self.registry.withdraw_stake(caller, amount, pay_to)?)
    }

    pub fn deposit_delegated_stake(
        &self,
        caller: &Address,
        validator: &Address,
        amount: Amount,
    ) -> Result<(), NodeError> {
        Ok(self
            .registry
            .deposit_delegated_stake(caller, validator, amount)?)
    }

    pub fn withdraw_delegated_stake(
        &self,
        caller: &Address,
        validator: &Address,
        amount: Amount,
        pay_to: &Address,
    ) -> Result<(), NodeError> {
        Ok(self
            .registry
            .withdraw_delegated_stake(caller, validator, amount, pay_to)?)
    }

    pub fn is_validator(&self, id: &Address) -> bool {
        self.registry.is_validator(id)
    }

    pub fn is_delegator(&self, id: &Address) -> bool {
        self.registry.is_delegator(id)
    }

    pub fn stake_of(&self, id: &Address) -> Amount {
        self.registry.stake_of(id)
    }

    pub fn validator(&self, id: &Address) -> Option<Validator> {
        self.registry.validator(id)
    }

    pub fn delegator(&self, id: &Address) -> Option<Delegator> {
        self.registry.delegator(id)
    }

    pub fn delegated_stake_of(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Amount, NodeError> {
        Ok(self.registry.delegated_stake_of(delegator, validator)?)
    }

    // ── Governance ───────────────────────────────────────────────────────

    pub fn create_proposal(
        &self,
        caller: &Address,
        topic: ProposalTopic,
        value: u64,
    ) -> Result<ProposalId, NodeError> {
        let now = self.clock.now();
        self.with_governance(|gov| {
            gov.create_proposal(self.registry.as_ref(), caller, topic, value, now)
        })
    }

    pub fn create_address_proposal(
        &self,
        caller: &Address,
        topic: ProposalTopic,
        contract: Address,
    ) -> Result<ProposalId, NodeError> {
        let now = self.clock.now();
        self.with_governance(|gov| {
            gov.create_address_proposal(self.registry.as_ref(), caller, topic, contract, now)
        })
    }

    pub fn vote_on_proposal(
        &self,
        caller: &Address,
        id: ProposalId,
    ) -> Result<ProposalStatus, NodeError> {
        let now = self.clock.now();
        self.with_governance(|gov| gov.vote_on_proposal(self.registry.as_ref(), caller, id, now))
    }

    pub fn cancel_proposal(&self, caller: &Address, id: ProposalId) -> Result<(), NodeError> {
        let now = self.clock.now();
        self.with_governance(|gov| gov.cancel_proposal(caller, id, now))
    }

    /// Tally proposal `id` against the current height without voting.
    pub fn finalize(&self, id: ProposalId) -> Result<ProposalStatus, NodeError> {
        let now = self.clock.now();
        self.with_governance(|gov| gov.finalize(self.registry.as_ref(), id, now))
    }

    pub fn is_proposal_open(&self, id: ProposalId) -> bool {
        let now = self.clock.now();
        self.governance().is_proposal_open(id, now)
    }

    pub fn proposal(&self, id: ProposalId) -> Option<Proposal> {
        self.governance().proposal(id).cloned()
    }

    pub fn proposal_count(&self) -> u64 {
        self.governance().proposal_count()
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Write the registry snapshot and proposal log to `path`.
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), NodeError> {
        let state = NodeState {
            registry: self.registry.snapshot()?,
            governance: self.governance().save_state()?,
        };
        let bytes = bincode::serialize(&state).map_err(|e| NodeError::State(e.to_string()))?;
        std::fs::write(path.as_ref(), bytes)?;
        tracing::info!(path = %path.as_ref().display(), "node state saved");
        Ok(())
    }

    /// Restart a node from state written by [`save_state`](Self::save_state).
    ///
    /// The persisted chain parameters win over any configured ones.
    pub fn load_state(
        path: impl AsRef<Path>,
        payments: Arc<dyn PaymentPrimitive>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let bytes = std::fs::read(path.as_ref())?;
        let state: NodeState =
            bincode::deserialize(&bytes).map_err(|e| NodeError::State(e.to_string()))?;
        let registry = Registry::restore(state.registry, payments)?;
        let governance = GovernanceEngine::load_state(&state.governance)?;
        governance.params().validate()?;
        tracing::info!(
            path = %path.as_ref().display(),
            proposals = governance.proposal_count(),
            "node state loaded"
        );
        Ok(Self {
            registry: Arc::new(registry),
            governance: Mutex::new(governance),
            governance_events: EventBus::new(),
            clock,
        })
    }
}
