//! Read-only view of bonded stake used to authorize and weigh votes.

use stakereg_ledger::Registry;
use stakereg_types::{Address, Amount};

/// What governance needs to know about stake. Never mutates.
pub trait StakeView {
    fn is_validator(&self, id: &Address) -> bool;

    /// Directly bonded stake of `id`, read live.
    fn stake_of(&self, id: &Address) -> Amount;

    /// Sum of directly bonded stake over all validators.
    fn total_staked(&self) -> Amount;
}

impl StakeView for Registry {
    fn is_validator(&self, id: &Address) -> bool {
        Registry::is_validator(self, id)
    }

    fn stake_of(&self, id: &Address) -> Amount {
        Registry::stake_of(self, id)
    }

    fn total_staked(&self) -> Amount {
        Registry::total_staked(self)
    }
}
