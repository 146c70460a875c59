//! Chain parameters: the initial values of every governable setting.
//!
//! Fractions are fixed-point with 3 implied decimal places on a percentage
//! scale: `100000` is 100.000%, `66666` is 66.666%.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::ParamsError;

/// Fixed-point denominator for every fraction parameter and quorum ratio.
pub const FRACTION_SCALE: u64 = 100_000;

/// Parameters consumed by consensus and governance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Blocks per slot.
    pub slot_size: u64,

    /// Slots per epoch.
    pub epoch_size: u64,

    /// Number of decisions a validator may miss before being penalized.
    pub decision_threshold: u64,

    /// Fraction of missed decisions that triggers a penalty.
    pub penalty_threshold: u64,

    /// Fraction of stake slashed per penalty. Default 2.000%.
    pub penalty: u64,

    /// Fraction of total staked value that must vote for a proposal to pass.
    pub vote_quorum: u64,

    /// Length of a proposal's voting window, in blocks.
    pub vote_time_period: u64,

    /// Address of the registry the consensus layer reads from, once governed.
    pub registry_address: Option<Address>,
}

impl ChainParams {
    /// Check every value is inside its legal range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("penalty_threshold", self.penalty_threshold),
            ("penalty", self.penalty),
            ("vote_quorum", self.vote_quorum),
        ] {
            if !is_fraction(value) {
                return Err(ParamsError::FractionOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("slot_size", self.slot_size),
            ("epoch_size", self.epoch_size),
            ("decision_threshold", self.decision_threshold),
            ("vote_time_period", self.vote_time_period),
        ] {
            if value == 0 {
                return Err(ParamsError::Zero { name });
            }
        }
        Ok(())
    }
}

/// Whether `value` is a legal fraction in `(0, FRACTION_SCALE]`.
pub fn is_fraction(value: u64) -> bool {
    value > 0 && value <= FRACTION_SCALE
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            slot_size: 10,
            epoch_size: 10,
            decision_threshold: 20,
            penalty_threshold: 66_666, // 66.666%
            penalty: 2_000,            // 2.000%
            vote_quorum: 66_666,       // 66.666%
            vote_time_period: 100,
            registry_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ChainParams::default();
        assert_eq!(params.vote_quorum, 66_666);
        assert_eq!(params.vote_time_period, 100);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn fraction_above_scale_rejected() {
        let params = ChainParams {
            penalty: 150_000,
            ..ChainParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ParamsError::FractionOutOfRange {
                name: "penalty",
                value: 150_000
            })
        );
    }

    #[test]
    fn zero_period_rejected() {
        let params = ChainParams {
            vote_time_period: 0,
            ..ChainParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ParamsError::Zero {
                name: "vote_time_period"
            })
        );
    }
}
