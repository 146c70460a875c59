//! Stake-weighted parameter governance.
//!
//! Validators propose changes to chain parameters and vote with their bonded
//! stake. A proposal passes as soon as the stake that voted for it reaches the
//! quorum fraction of total staked value, and fails once its voting window
//! closes without reaching it. The proposer may cancel while voting is open.
//!
//! Lifecycle: `Open` → `Passed` | `Failed` | `Cancelled`, all terminal.
//! Applying a passed change is left to whoever observes the `Passed` status.

pub mod engine;
pub mod error;
pub mod event;
pub mod params;
pub mod proposal;
pub mod view;

pub use engine::{quorum_ratio, GovernanceEngine, GovernanceSnapshot};
pub use error::GovernanceError;
pub use event::GovernanceEvent;
pub use params::ProposalTopic;
pub use proposal::{Proposal, ProposalChange, ProposalId, ProposalStatus};
pub use view::StakeView;
