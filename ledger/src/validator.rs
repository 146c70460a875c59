//! Validator records and the total-staked accumulator.

use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount};
use std::collections::HashMap;

use crate::error::RegistryError;
use crate::event::RegistryEvent;
use crate::indexed_set::IndexedSet;

/// A validator's bonded position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Value bonded directly by the validator.
    pub stake: Amount,
    /// Sum of all delegations currently backing this validator.
    pub delegated_stake: Amount,
    /// Always `stake + delegated_stake`.
    pub total_stake: Amount,
    /// Delegators with a nonzero allocation to this validator.
    pub delegators: IndexedSet<Address>,
}

/// Authoritative record of who is a validator and how much they staked.
///
/// A record exists only while its `stake` is nonzero: it is created by the
/// first deposit and dropped entirely when a withdrawal drains `stake`.
#[derive(Debug, Default)]
pub struct StakeLedger {
    validators: HashMap<Address, Validator>,
    /// Validator addresses in order of first deposit (swap-and-pop on exit).
    members: IndexedSet<Address>,
    total_staked: Amount,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_validator(&self, id: &Address) -> bool {
        self.validators
            .get(id)
            .is_some_and(|v| !v.stake.is_zero())
    }

    pub fn validator(&self, id: &Address) -> Option<&Validator> {
        self.validators.get(id)
    }

    /// Directly bonded stake of `id`, zero for non-validators.
    pub fn stake_of(&self, id: &Address) -> Amount {
        self.validators.get(id).map_or(Amount::ZERO, |v| v.stake)
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn members(&self) -> &[Address] {
        self.members.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Validator)> {
        self.validators.iter()
    }

    /// Bond `amount` from `id`, creating the validator record if needed.
    pub fn deposit(&mut self, id: &Address, amount: Amount) -> Result<RegistryEvent, RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        let total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let current = self.validators.get(id).cloned().unwrap_or_default();
        let stake = current
            .stake
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let total_stake = current
            .total_stake
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;

        let is_new = !self.is_validator(id);
        let record = self.validators.entry(id.clone()).or_default();
        record.stake = stake;
        record.total_stake = total_stake;
        self.members.insert(id.clone());
        self.total_staked = total_staked;

        if is_new {
            tracing::info!(validator = %id, %amount, "validator added");
            Ok(RegistryEvent::ValidatorAdded {
                validator: id.clone(),
                amount,
            })
        } else {
            tracing::debug!(validator = %id, %amount, %stake, "validator increased stake");
            Ok(RegistryEvent::ValidatorIncreasedStake {
                validator: id.clone(),
                amount,
            })
        }
    }

    /// Unbond `amount` of `id`'s own stake.
    ///
    /// Draining the stake to zero removes the validator, which is refused while
    /// any delegated stake still backs it.
    ///
    /// Checks run in the order `NotAValidator`, `InsufficientStake`, `ZeroAmount`.
    pub fn withdraw(&mut self, id: &Address, amount: Amount) -> Result<RegistryEvent, RegistryError> {
        let current = match self.validators.get(id) {
            Some(v) if !v.stake.is_zero() => v,
            _ => return Err(RegistryError::NotAValidator(id.clone())),
        };
        let stake = current
            .stake
            .checked_sub(amount)
            .ok_or(RegistryError::InsufficientStake {
                requested: amount,
                available: current.stake,
            })?;
        if amount.is_zero() {
            return Err(RegistryError::ZeroAmount);
        }
        if stake.is_zero() && !current.delegated_stake.is_zero() {
            return Err(RegistryError::DelegationsOutstanding {
                validator: id.clone(),
                delegated: current.delegated_stake,
            });
        }
        let total_stake = current
            .total_stake
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;
        let total_staked = self
            .total_staked
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;

        self.total_staked = total_staked;
        if stake.is_zero() {
            self.validators.remove(id);
            self.members.remove(id);
            tracing::info!(validator = %id, %amount, "validator removed");
            return Ok(RegistryEvent::ValidatorRemoved {
                validator: id.clone(),
                amount,
            });
        }
        if let Some(record) = self.validators.get_mut(id) {
            record.stake = stake;
            record.total_stake = total_stake;
        }
        tracing::debug!(validator = %id, %amount, %stake, "validator decreased stake");
        Ok(RegistryEvent::ValidatorDecreasedStake {
            validator: id.clone(),
            amount,
        })
    }

    /// Add `delegator` to the validator's delegator set.
    pub fn add_delegator(&mut self, validator: &Address, delegator: &Address) -> Result<bool, RegistryError> {
        let record = self.live_mut(validator)?;
        Ok(record.delegators.insert(delegator.clone()))
    }

    /// Remove `delegator` from the validator's delegator set.
    pub fn remove_delegator(&mut self, validator: &Address, delegator: &Address) -> Result<bool, RegistryError> {
        let record = self.live_mut(validator)?;
        Ok(record.delegators.remove(delegator))
    }

    /// Credit delegated stake to a validator. `total_staked` is untouched.
    pub fn increase_delegated_stake(&mut self, validator: &Address, amount: Amount) -> Result<(), RegistryError> {
        let record = self.live_mut(validator)?;
        let delegated_stake = record
            .delegated_stake
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        let total_stake = record
            .total_stake
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        record.delegated_stake = delegated_stake;
        record.total_stake = total_stake;
        Ok(())
    }

    /// Debit delegated stake from a validator. `total_staked` is untouched.
    pub fn decrease_delegated_stake(&mut self, validator: &Address, amount: Amount) -> Result<(), RegistryError> {
        let record = self.live_mut(validator)?;
        let delegated_stake =
            record
                .delegated_stake
                .checked_sub(amount)
                .ok_or(RegistryError::InsufficientDelegation {
                    requested: amount,
                    available: record.delegated_stake,
                })?;
        let total_stake = record
            .total_stake
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;
        record.delegated_stake = delegated_stake;
        record.total_stake = total_stake;
        Ok(())
    }

    /// Rebuild a ledger from persisted records, in membership order.
    pub(crate) fn from_records(records: Vec<(Address, Validator)>) -> Result<Self, RegistryError> {
        let mut ledger = Self::new();
        for (id, record) in records {
            ledger.total_staked = ledger
                .total_staked
                .checked_add(record.stake)
                .ok_or(RegistryError::Overflow)?;
            if !ledger.members.insert(id.clone()) {
                return Err(RegistryError::CorruptSnapshot(format!(
                    "validator {id} appears twice"
                )));
            }
            ledger.validators.insert(id, record);
        }
        Ok(ledger)
    }

    fn live_mut(&mut self, validator: &Address) -> Result<&mut Validator, RegistryError> {
        match self.validators.get_mut(validator) {
            Some(record) if !record.stake.is_zero() => Ok(record),
            _ => Err(RegistryError::NotAValidator(validator.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakereg_types::UNIT;

    fn addr(name: &str) -> Address {
        Address::new(name)
    }

    fn one() -> Amount {
        Amount::new(UNIT)
    }

    #[test]
    fn first_deposit_adds_validator() {
        let mut ledger = StakeLedger::new();
        let event = ledger.deposit(&addr("v"), one()).unwrap();
        assert_eq!(
            event,
            RegistryEvent::ValidatorAdded {
                validator: addr("v"),
                amount: one()
            }
        );
        assert!(ledger.is_validator(&addr("v")));
        assert_eq!(ledger.stake_of(&addr("v")), one());
        assert_eq!(ledger.total_staked(), one());
        assert_eq!(ledger.members(), &[addr("v")]);
    }

    #[test]
    fn second_deposit_increases_stake() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), one()).unwrap();
        let event = ledger.deposit(&addr("v"), one()).unwrap();
        assert!(matches!(event, RegistryEvent::ValidatorIncreasedStake { .. }));
        let record = ledger.validator(&addr("v")).unwrap();
        assert_eq!(record.stake, Amount::new(2 * UNIT));
        assert_eq!(record.total_stake, Amount::new(2 * UNIT));
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut ledger = StakeLedger::new();
        assert_eq!(
            ledger.deposit(&addr("v"), Amount::ZERO),
            Err(RegistryError::ZeroAmount)
        );
        assert!(!ledger.is_validator(&addr("v")));
    }

    #[test]
    fn full_withdraw_removes_record() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), Amount::new(2 * UNIT)).unwrap();
        let event = ledger.withdraw(&addr("v"), Amount::new(2 * UNIT)).unwrap();
        assert!(matches!(event, RegistryEvent::ValidatorRemoved { .. }));
        assert!(!ledger.is_validator(&addr("v")));
        assert!(ledger.validator(&addr("v")).is_none());
        assert!(ledger.members().is_empty());
        assert_eq!(ledger.total_staked(), Amount::ZERO);
    }

    #[test]
    fn partial_withdraw_decreases_stake() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), Amount::new(2 * UNIT)).unwrap();
        let event = ledger.withdraw(&addr("v"), one()).unwrap();
        assert!(matches!(event, RegistryEvent::ValidatorDecreasedStake { .. }));
        assert_eq!(ledger.stake_of(&addr("v")), one());
        assert_eq!(ledger.total_staked(), one());
    }

    #[test]
    fn overwithdraw_rejected_without_mutation() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), one()).unwrap();
        assert_eq!(
            ledger.withdraw(&addr("v"), Amount::new(UNIT + 1)),
            Err(RegistryError::InsufficientStake {
                requested: Amount::new(UNIT + 1),
                available: one()
            })
        );
        assert_eq!(ledger.stake_of(&addr("v")), one());
    }

    #[test]
    fn withdraw_from_non_validator_rejected() {
        let mut ledger = StakeLedger::new();
        assert_eq!(
            ledger.withdraw(&addr("nobody"), one()),
            Err(RegistryError::NotAValidator(addr("nobody")))
        );
    }

    #[test]
    fn withdraw_checks_membership_before_amount() {
        let mut ledger = StakeLedger::new();
        assert_eq!(
            ledger.withdraw(&addr("nobody"), Amount::ZERO),
            Err(RegistryError::NotAValidator(addr("nobody")))
        );
        ledger.deposit(&addr("v"), one()).unwrap();
        assert_eq!(
            ledger.withdraw(&addr("v"), Amount::ZERO),
            Err(RegistryError::ZeroAmount)
        );
        assert_eq!(ledger.stake_of(&addr("v")), one());
    }

    #[test]
    fn exit_refused_while_delegated() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), one()).unwrap();
        ledger.increase_delegated_stake(&addr("v"), one()).unwrap();
        assert!(matches!(
            ledger.withdraw(&addr("v"), one()),
            Err(RegistryError::DelegationsOutstanding { .. })
        ));
        // Partial exits are still fine.
        ledger.withdraw(&addr("v"), Amount::new(UNIT / 2)).unwrap();
        let record = ledger.validator(&addr("v")).unwrap();
        assert_eq!(record.total_stake, Amount::new(UNIT + UNIT / 2));
    }

    #[test]
    fn delegated_stake_keeps_total_in_sync() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), one()).unwrap();
        ledger.increase_delegated_stake(&addr("v"), Amount::new(3)).unwrap();
        ledger.decrease_delegated_stake(&addr("v"), Amount::new(1)).unwrap();
        let record = ledger.validator(&addr("v")).unwrap();
        assert_eq!(record.delegated_stake, Amount::new(2));
        assert_eq!(record.total_stake, Amount::new(UNIT + 2));
        assert_eq!(ledger.total_staked(), one());
    }

    #[test]
    fn delegator_set_membership() {
        let mut ledger = StakeLedger::new();
        ledger.deposit(&addr("v"), one()).unwrap();
        assert!(ledger.add_delegator(&addr("v"), &addr("d1")).unwrap());
        assert!(ledger.add_delegator(&addr("v"), &addr("d2")).unwrap());
        assert!(!ledger.add_delegator(&addr("v"), &addr("d1")).unwrap());
        assert!(ledger.remove_delegator(&addr("v"), &addr("d1")).unwrap());
        let record = ledger.validator(&addr("v")).unwrap();
        assert_eq!(record.delegators.as_slice(), &[addr("d2")]);
        assert!(ledger.add_delegator(&addr("ghost"), &addr("d1")).is_err());
    }

    #[test]
    fn membership_order_swaps_on_exit() {
        let mut ledger = StakeLedger::new();
        for name in ["a", "b", "c"] {
            ledger.deposit(&addr(name), one()).unwrap();
        }
        ledger.withdraw(&addr("a"), one()).unwrap();
        assert_eq!(ledger.members(), &[addr("c"), addr("b")]);
    }
}
