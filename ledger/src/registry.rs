//! The registry: stake and delegation ledgers plus the total-bonded accumulator.

use stakereg_types::{Address, Amount};
use stakereg_utils::EventBus;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::delegation::{DelegationLedger, Delegator};
use crate::error::RegistryError;
use crate::event::RegistryEvent;
use crate::guard::{GuardToken, ReentrancyGuard};
use crate::payment::PaymentPrimitive;
use crate::snapshot::RegistrySnapshot;
use crate::validator::{StakeLedger, Validator};

/// Ledger state guarded by the registry mutex.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) stakes: StakeLedger,
    pub(crate) delegations: DelegationLedger,
    pub(crate) total_bonded: Amount,
}

impl RegistryState {
    fn deposit_stake(&mut self, caller: &Address, amount: Amount) -> Result<Vec<RegistryEvent>, RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        let total_bonded = self
            .total_bonded
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let event = self.stakes.deposit(caller, amount)?;
        self.total_bonded = total_bonded;
        Ok(vec![event])
    }

    fn withdraw_stake(&mut self, caller: &Address, amount: Amount) -> Result<Vec<RegistryEvent>, RegistryError> {
        let event = self.stakes.withdraw(caller, amount)?;
        // amount <= stake <= total_staked <= total_bonded
        self.total_bonded = self.total_bonded.saturating_sub(amount);
        Ok(vec![event])
    }

    fn deposit_delegated_stake(
        &mut self,
        caller: &Address,
        validator: &Address,
        amount: Amount,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        if !self.stakes.is_validator(validator) {
            return Err(RegistryError::NotAValidator(validator.clone()));
        }
        // Every per-record and per-ledger sum is bounded by the bonded total,
        // so once this addition fits, none of the steps below can overflow.
        let total_bonded = self
            .total_bonded
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let is_new = self.delegations.delegated_to(caller, validator).is_zero();

        self.delegations.allocate(caller, validator, amount)?;
        self.stakes.increase_delegated_stake(validator, amount)?;
        if is_new {
            self.stakes.add_delegator(validator, caller)?;
        }
        self.total_bonded = total_bonded;

        let event = if is_new {
            tracing::info!(delegator = %caller, %validator, %amount, "delegator added");
            RegistryEvent::DelegatorAdded {
                delegator: caller.clone(),
                validator: validator.clone(),
                amount,
            }
        } else {
            tracing::debug!(delegator = %caller, %validator, %amount, "delegator increased stake");
            RegistryEvent::DelegatorIncreasedStake {
                delegator: caller.clone(),
                validator: validator.clone(),
                amount,
            }
        };
        Ok(vec![event])
    }

    fn withdraw_delegated_stake(
        &mut self,
        caller: &Address,
        validator: &Address,
        amount: Amount,
    ) -> Result<Vec<RegistryEvent>, RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        let allocation = self.delegated_stake_of(caller, validator)?;
        if amount > allocation {
            return Err(RegistryError::InsufficientDelegation {
                requested: amount,
                available: allocation,
            });
        }
        let total_bonded = self
            .total_bonded
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;

        let outcome = self.delegations.deallocate(caller, validator, amount)?;
        self.stakes.decrease_delegated_stake(validator, amount)?;
        if outcome.allocation_cleared {
            self.stakes.remove_delegator(validator, caller)?;
        }
        self.total_bonded = total_bonded;

        if outcome.delegator_cleared {
            tracing::info!(delegator = %caller, "delegator fully unbonded");
        }
        let event = if outcome.allocation_cleared {
            tracing::info!(delegator = %caller, %validator, %amount, "delegator removed");
            RegistryEvent::DelegatorRemoved {
                delegator: caller.clone(),
                validator: validator.clone(),
                amount,
            }
        } else {
            tracing::debug!(delegator = %caller, %validator, %amount, "delegator decreased stake");
            RegistryEvent::DelegatorDecreasedStake {
                delegator: caller.clone(),
                validator: validator.clone(),
                amount,
            }
        };
        Ok(vec![event])
    }

    fn delegated_stake_of(&self, delegator: &Address, validator: &Address) -> Result<Amount, RegistryError> {
        if !self.delegations.is_delegator(delegator) {
            return Err(RegistryError::NotADelegator(delegator.clone()));
        }
        if !self.stakes.is_validator(validator) {
            return Err(RegistryError::NotAValidator(validator.clone()));
        }
        let allocation = self.delegations.delegated_to(delegator, validator);
        if allocation.is_zero() {
            return Err(RegistryError::NotCurrentlyDelegated {
                delegator: delegator.clone(),
                validator: validator.clone(),
            });
        }
        Ok(allocation)
    }

    /// Recompute every accumulator and cross-reference from the records.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let mut staked = Amount::ZERO;
        for (id, v) in self.stakes.iter() {
            if v.stake.is_zero() {
                return Err(format!("validator {id} has a record but no stake"));
            }
            if v.stake.checked_add(v.delegated_stake) != Some(v.total_stake) {
                return Err(format!("validator {id}: total_stake != stake + delegated_stake"));
            }
            let backing = v
                .delegators
                .iter()
                .try_fold(Amount::ZERO, |acc, d| {
                    acc.checked_add(self.delegations.delegated_to(d, id))
                })
                .ok_or_else(|| format!("validator {id}: delegated backing overflows"))?;
            if backing != v.delegated_stake {
                return Err(format!("validator {id}: delegated_stake disagrees with allocations"));
            }
            staked = staked.checked_add(v.stake).ok_or("total staked overflows")?;
        }
        if staked != self.stakes.total_staked() {
            return Err("total_staked disagrees with validator records".into());
        }
        if self.stakes.members().len() != self.stakes.iter().count()
            || self.stakes.members().iter().any(|m| !self.stakes.is_validator(m))
        {
            return Err("validator membership list disagrees with records".into());
        }

        let mut delegated = Amount::ZERO;
        for (id, d) in self.delegations.iter() {
            if d.total_delegated_stake.is_zero() {
                return Err(format!("delegator {id} has a record but no stake"));
            }
            let mut sum = Amount::ZERO;
            for (validator, allocation) in &d.delegated_validators {
                if allocation.is_zero() {
                    return Err(format!("delegator {id} stores a zero allocation"));
                }
                let listed = self
                    .stakes
                    .validator(validator)
                    .is_some_and(|v| v.delegators.contains(id));
                if !listed {
                    return Err(format!("delegator {id} missing from {validator}'s delegator set"));
                }
                sum = sum.checked_add(*allocation).ok_or("allocation sum overflows")?;
            }
            if sum != d.total_delegated_stake {
                return Err(format!("delegator {id}: total disagrees with allocations"));
            }
            delegated = delegated.checked_add(sum).ok_or("total delegated overflows")?;
        }
        if delegated != self.delegations.total_stake_delegated() {
            return Err("total_stake_delegated disagrees with delegator records".into());
        }
        if staked.checked_add(delegated) != Some(self.total_bonded) {
            return Err("total_bonded != total_staked + total_stake_delegated".into());
        }
        Ok(())
    }
}

/// Validator and delegator registry.
///
/// Shareable behind an `Arc`: reads take the state lock briefly, and every
/// mutation first claims the [`ReentrancyGuard`], so a payment primitive that
/// calls back into the registry can read freshly committed state but cannot
/// start another mutation.
pub struct Registry {
    state: Mutex<RegistryState>,
    guard: ReentrancyGuard,
    payments: Arc<dyn PaymentPrimitive>,
    events: EventBus<RegistryEvent>,
}

impl Registry {
    pub fn new(payments: Arc<dyn PaymentPrimitive>) -> Self {
        Self::with_state(RegistryState::default(), payments)
    }

    fn with_state(state: RegistryState, payments: Arc<dyn PaymentPrimitive>) -> Self {
        Self {
            state: Mutex::new(state),
            guard: ReentrancyGuard::new(),
            payments,
            events: EventBus::new(),
        }
    }

    /// Register an observer for committed registry events.
    pub fn subscribe(&self, listener: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.events.subscribe(listener);
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // Mutations are computed before they are applied, so a panic while the
        // lock is held never leaves a half-written record behind.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Bond `amount` as `caller`'s own validator stake.
    pub fn deposit_stake(&self, caller: &Address, amount: Amount) -> Result<(), RegistryError> {
        let _token = self.guard.enter()?;
        let events = self.state().deposit_stake(caller, amount)?;
        self.events.emit_all(&events);
        Ok(())
    }

    /// Unbond `amount` of `caller`'s validator stake and pay it to `pay_to`.
    ///
    /// The ledger commits before the payout. If the payment primitive reports
    /// failure the call returns [`RegistryError::TransferFailed`] and the
    /// ledger is not re-credited.
    pub fn withdraw_stake(&self, caller: &Address, amount: Amount, pay_to: &Address) -> Result<(), RegistryError> {
        let token = self.guard.enter()?;
        let events = self.state().withdraw_stake(caller, amount)?;
        self.events.emit_all(&events);
        self.pay_out(&token, pay_to, amount)
    }

    /// Delegate `amount` from `caller` to `validator`.
    pub fn deposit_delegated_stake(
        &self,
        caller: &Address,
        validator: &Address,
        amount: Amount,
    ) -> Result<(), RegistryError> {
        let _token = self.guard.enter()?;
        let events = self
            .state()
            .deposit_delegated_stake(caller, validator, amount)?;
        self.events.emit_all(&events);
        Ok(())
    }

    /// Withdraw `amount` of `caller`'s delegation to `validator` and pay it to
    /// `pay_to`, with the same payout contract as [`Registry::withdraw_stake`].
    pub fn withdraw_delegated_stake(
        &self,
        caller: &Address,
        validator: &Address,
        amount: Amount,
        pay_to: &Address,
    ) -> Result<(), RegistryError> {
        let token = self.guard.enter()?;
        let events = self
            .state()
            .withdraw_delegated_stake(caller, validator, amount)?;
        self.events.emit_all(&events);
        self.pay_out(&token, pay_to, amount)
    }

    /// Terminal step of a withdrawal. Runs with the state lock released and
    /// the guard still held.
    fn pay_out(&self, _token: &GuardToken<'_>, to: &Address, amount: Amount) -> Result<(), RegistryError> {
        if self.payments.pay(to, amount) {
            tracing::debug!(%to, %amount, "payout settled");
            Ok(())
        } else {
            tracing::warn!(%to, %amount, "payout failed after ledger commit");
            Err(RegistryError::TransferFailed {
                to: to.clone(),
                amount,
            })
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn is_validator(&self, id: &Address) -> bool {
        self.state().stakes.is_validator(id)
    }

    pub fn is_delegator(&self, id: &Address) -> bool {
        self.state().delegations.is_delegator(id)
    }

    /// Directly bonded stake of `id` (zero for non-validators).
    pub fn stake_of(&self, id: &Address) -> Amount {
        self.state().stakes.stake_of(id)
    }

    pub fn validator(&self, id: &Address) -> Option<Validator> {
        self.state().stakes.validator(id).cloned()
    }

    pub fn delegator(&self, id: &Address) -> Option<Delegator> {
        self.state().delegations.delegator(id).cloned()
    }

    /// Current validators, in order of first deposit.
    pub fn validators(&self) -> Vec<Address> {
        self.state().stakes.members().to_vec()
    }

    pub fn delegators_of(&self, validator: &Address) -> Result<Vec<Address>, RegistryError> {
        self.state()
            .stakes
            .validator(validator)
            .map(|v| v.delegators.as_slice().to_vec())
            .ok_or_else(|| RegistryError::NotAValidator(validator.clone()))
    }

    /// Allocation from `delegator` to `validator`.
    pub fn delegated_stake_of(&self, delegator: &Address, validator: &Address) -> Result<Amount, RegistryError> {
        self.state().delegated_stake_of(delegator, validator)
    }

    pub fn total_staked(&self) -> Amount {
        self.state().stakes.total_staked()
    }

    pub fn total_stake_delegated(&self) -> Amount {
        self.state().delegations.total_stake_delegated()
    }

    pub fn total_bonded(&self) -> Amount {
        self.state().total_bonded
    }

    /// Full-scan check of every accounting invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.state().check_invariants()
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Capture the full ledger state.
    pub fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        RegistrySnapshot::capture(&self.state())
    }

    /// Rebuild a registry from a snapshot, verifying its hash and invariants.
    pub fn restore(snapshot: RegistrySnapshot, payments: Arc<dyn PaymentPrimitive>) -> Result<Self, RegistryError> {
        let state = snapshot.into_state()?;
        Ok(Self::with_state(state, payments))
    }
}
