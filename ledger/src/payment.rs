//! Boundary to the value-transfer layer.

use stakereg_types::{Address, Amount};

/// Pays out withdrawn stake.
///
/// Implementations perform one synchronous transfer and report whether it
/// succeeded. The registry calls `pay` as the last step of a withdrawal, after
/// the ledger has committed, while its [`ReentrancyGuard`](crate::ReentrancyGuard)
/// is still held; any mutating registry call made from inside `pay` is rejected.
pub trait PaymentPrimitive: Send + Sync {
    fn pay(&self, to: &Address, amount: Amount) -> bool;
}
