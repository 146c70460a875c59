//! Single-writer guard for registry mutations.
//!
//! Every mutating registry operation holds a [`GuardToken`] from its first check
//! until its payout (if any) has returned. A second mutating call that arrives
//! while a token is alive, including one made from inside the payment
//! primitive, is rejected before it reads any state.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::RegistryError;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    busy: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or fail with [`RegistryError::OperationInProgress`].
    pub fn enter(&self) -> Result<GuardToken<'_>, RegistryError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                tracing::warn!("rejected nested registry mutation");
                RegistryError::OperationInProgress
            })?;
        Ok(GuardToken { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof that the holder owns the registry's write slot. Released on drop.
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}
