//! Nullable payment primitive that records transfers instead of moving value.

use stakereg_ledger::PaymentPrimitive;
use stakereg_types::{Address, Amount};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One attempted transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub to: Address,
    pub amount: Amount,
    pub succeeded: bool,
}

/// Records every transfer it is asked to make. Succeeds unless switched to failing.
#[derive(Debug, Default)]
pub struct NullPayment {
    failing: AtomicBool,
    log: Mutex<Vec<Payment>>,
}

impl NullPayment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent transfer report failure.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every attempted transfer, in order.
    pub fn payments(&self) -> Vec<Payment> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Sum of successful transfers to `to`.
    pub fn paid_to(&self, to: &Address) -> Amount {
        self.payments()
            .iter()
            .filter(|p| p.succeeded && p.to == *to)
            .map(|p| p.amount)
            .sum()
    }
}

impl PaymentPrimitive for NullPayment {
    fn pay(&self, to: &Address, amount: Amount) -> bool {
        let succeeded = !self.failing.load(Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push(Payment {
                to: to.clone(),
                amount,
                succeeded,
            });
        }
        tracing::trace!(%to, %amount, succeeded, "null payment");
        succeeded
    }
}
