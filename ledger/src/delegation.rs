//! Delegator records and the total-delegated accumulator.
//!
//! This ledger never checks that a validator exists; the [`Registry`](crate::Registry)
//! does that before calling in.

use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount};
use std::collections::{BTreeMap, HashMap};

use crate::error::RegistryError;

/// A delegator's allocations across validators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegator {
    /// Sum of every allocation below.
    pub total_delegated_stake: Amount,
    /// validator → amount delegated to it. Zero allocations are never stored.
    pub delegated_validators: BTreeMap<Address, Amount>,
}

/// What a [`DelegationLedger::deallocate`] call cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deallocation {
    /// The allocation to this validator reached zero.
    pub allocation_cleared: bool,
    /// The delegator's total reached zero and its record was dropped.
    pub delegator_cleared: bool,
}

#[derive(Debug, Default)]
pub struct DelegationLedger {
    delegators: HashMap<Address, Delegator>,
    total_stake_delegated: Amount,
}

impl DelegationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_delegator(&self, id: &Address) -> bool {
        self.delegators
            .get(id)
            .is_some_and(|d| !d.total_delegated_stake.is_zero())
    }

    pub fn delegator(&self, id: &Address) -> Option<&Delegator> {
        self.delegators.get(id)
    }

    /// Amount `delegator` currently allocates to `validator` (zero if none).
    pub fn delegated_to(&self, delegator: &Address, validator: &Address) -> Amount {
        self.delegators
            .get(delegator)
            .and_then(|d| d.delegated_validators.get(validator))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn total_stake_delegated(&self) -> Amount {
        self.total_stake_delegated
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Delegator)> {
        self.delegators.iter()
    }

    /// Add `amount` to the allocation from `delegator` to `validator`.
    pub fn allocate(
        &mut self,
        delegator: &Address,
        validator: &Address,
        amount: Amount,
    ) -> Result<(), RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        let total_stake_delegated = self
            .total_stake_delegated
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let total = self
            .delegators
            .get(delegator)
            .map_or(Amount::ZERO, |d| d.total_delegated_stake)
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let allocation = self
            .delegated_to(delegator, validator)
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;

        let record = self.delegators.entry(delegator.clone()).or_default();
        record.total_delegated_stake = total;
        record.delegated_validators.insert(validator.clone(), allocation);
        self.total_stake_delegated = total_stake_delegated;
        tracing::debug!(%delegator, %validator, %amount, %allocation, "delegation allocated");
        Ok(())
    }

    /// Remove `amount` from the allocation from `delegator` to `validator`.
    ///
    /// Empty allocations are dropped, and the delegator record with them once
    /// its total reaches zero.
    pub fn deallocate(
        &mut self,
        delegator: &Address,
        validator: &Address,
        amount: Amount,
    ) -> Result<Deallocation, RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        let record = self
            .delegators
            .get(delegator)
            .filter(|d| !d.total_delegated_stake.is_zero())
            .ok_or_else(|| RegistryError::NotADelegator(delegator.clone()))?;
        let current = record
            .delegated_validators
            .get(validator)
            .copied()
            .unwrap_or(Amount::ZERO);
        let allocation = current
            .checked_sub(amount)
            .ok_or(RegistryError::InsufficientDelegation {
                requested: amount,
                available: current,
            })?;
        let total = record
            .total_delegated_stake
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;
        let total_stake_delegated = self
            .total_stake_delegated
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;

        self.total_stake_delegated = total_stake_delegated;
        let outcome = Deallocation {
            allocation_cleared: allocation.is_zero(),
            delegator_cleared: total.is_zero(),
        };
        if outcome.delegator_cleared {
            self.delegators.remove(delegator);
            tracing::debug!(%delegator, "delegator record cleared");
        } else if let Some(record) = self.delegators.get_mut(delegator) {
            record.total_delegated_stake = total;
            if outcome.allocation_cleared {
                record.delegated_validators.remove(validator);
            } else {
                record.delegated_validators.insert(validator.clone(), allocation);
            }
        }
        tracing::debug!(%delegator, %validator, %amount, %allocation, "delegation deallocated");
        Ok(outcome)
    }

    /// Rebuild a ledger from persisted records.
    pub(crate) fn from_records(records: Vec<(Address, Delegator)>) -> Result<Self, RegistryError> {
        let mut ledger = Self::new();
        for (id, record) in records {
            ledger.total_stake_delegated = ledger
                .total_stake_delegated
                .checked_add(record.total_delegated_stake)
                .ok_or(RegistryError::Overflow)?;
            if ledger.delegators.insert(id.clone(), record).is_some() {
                return Err(RegistryError::CorruptSnapshot(format!(
                    "delegator {id} appears twice"
                )));
            }
        }
        Ok(ledger)
    }
}
