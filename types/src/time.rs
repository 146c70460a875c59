//! Logical time used for proposal windows.
//!
//! The registry never reads wall-clock time. Heights come from the surrounding
//! chain through a [`Clock`] and are only compared, never scheduled against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block height (or any monotonically non-decreasing logical tick).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Height zero.
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// `self + period`, saturating at `u64::MAX`.
    pub fn saturating_add(&self, period: u64) -> Self {
        Self(self.0.saturating_add(period))
    }

    /// Whether `now` has reached or passed this height.
    pub fn is_reached(&self, now: BlockHeight) -> bool {
        now.0 >= self.0
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of the current height.
pub trait Clock: Send + Sync {
    fn now(&self) -> BlockHeight;
}
