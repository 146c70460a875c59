//! Stake registry ledgers.
//!
//! Three tightly coupled pieces of accounting live here:
//! - [`StakeLedger`]: who is a validator and how much they bonded directly.
//! - [`DelegationLedger`]: third parties backing validators with extra stake.
//! - [`Registry`]: composes both, owns the total-bonded accumulator, and is the
//!   only entry point for deposits and withdrawals.
//!
//! Every registry operation either commits fully or fails with no state change.
//! The single exception is a withdrawal whose payout the [`PaymentPrimitive`]
//! rejects: the ledger mutation has already committed and the call fails with
//! [`RegistryError::TransferFailed`].

pub mod delegation;
pub mod error;
pub mod event;
pub mod guard;
pub mod indexed_set;
pub mod payment;
pub mod registry;
pub mod snapshot;
pub mod validator;

pub use delegation::{Deallocation, DelegationLedger, Delegator};
pub use error::RegistryError;
pub use event::RegistryEvent;
pub use guard::{GuardToken, ReentrancyGuard};
pub use indexed_set::IndexedSet;
pub use payment::PaymentPrimitive;
pub use registry::Registry;
pub use snapshot::RegistrySnapshot;
pub use validator::{StakeLedger, Validator};
