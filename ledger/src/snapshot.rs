//! Registry snapshots capturing every validator and delegator record at a point in time.
//!
//! Records are stored sorted by address so the encoding, and therefore the
//! snapshot hash, is deterministic. Restoring recomputes the hash and the
//! accumulators and rejects any snapshot that disagrees with itself.

use serde::{Deserialize, Serialize};
use stakereg_types::{Address, Amount};

use crate::delegation::{DelegationLedger, Delegator};
use crate::error::RegistryError;
use crate::registry::RegistryState;
use crate::validator::{StakeLedger, Validator};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Blake2b-256 of the encoded records and accumulators.
    pub hash: [u8; 32],
    pub version: u32,
    /// Validator addresses in membership order.
    pub members: Vec<Address>,
    /// Validator records sorted by address.
    pub validators: Vec<(Address, Validator)>,
    /// Delegator records sorted by address.
    pub delegators: Vec<(Address, Delegator)>,
    pub total_staked: Amount,
    pub total_stake_delegated: Amount,
    pub total_bonded: Amount,
}

impl RegistrySnapshot {
    pub(crate) fn capture(state: &RegistryState) -> Result<Self, RegistryError> {
        let mut validators: Vec<(Address, Validator)> = state
            .stakes
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        validators.sort_by(|a, b| a.0.cmp(&b.0));
        let mut delegators: Vec<(Address, Delegator)> = state
            .delegations
            .iter()
            .map(|(id, d)| (id.clone(), d.clone()))
            .collect();
        delegators.sort_by(|a, b| a.0.cmp(&b.0));

        let mut snap = Self {
            hash: [0u8; 32],
            version: SNAPSHOT_VERSION,
            members: state.stakes.members().to_vec(),
            validators,
            delegators,
            total_staked: state.stakes.total_staked(),
            total_stake_delegated: state.delegations.total_stake_delegated(),
            total_bonded: state.total_bonded,
        };
        snap.hash = snap.compute_hash()?;
        Ok(snap)
    }

    /// Compute the Blake2b-256 hash of this snapshot deterministically.
    fn compute_hash(&self) -> Result<[u8; 32], RegistryError> {
        use blake2::digest::consts::U32;
        use blake2::{Blake2b, Digest};

        let body = bincode::serialize(&(
            self.version,
            &self.members,
            &self.validators,
            &self.delegators,
            self.total_staked,
            self.total_stake_delegated,
            self.total_bonded,
        ))
        .map_err(|e| RegistryError::CorruptSnapshot(e.to_string()))?;

        let mut hasher = Blake2b::<U32>::new();
        hasher.update(&body);
        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        Ok(out)
    }

    /// Verify the snapshot hash matches the records.
    pub fn verify(&self) -> bool {
        self.compute_hash().is_ok_and(|hash| hash == self.hash)
    }

    /// Serialize the snapshot to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        bincode::serialize(self).map_err(|e| RegistryError::CorruptSnapshot(e.to_string()))
    }

    /// Deserialize a snapshot from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RegistryError> {
        bincode::deserialize(bytes).map_err(|e| RegistryError::CorruptSnapshot(e.to_string()))
    }

    pub(crate) fn into_state(self) -> Result<RegistryState, RegistryError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(RegistryError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        if !self.verify() {
            return Err(RegistryError::CorruptSnapshot("hash mismatch".into()));
        }

        let mut by_address: std::collections::HashMap<Address, Validator> =
            self.validators.into_iter().collect();
        let mut ordered = Vec::with_capacity(self.members.len());
        for id in self.members {
            let record = by_address.remove(&id).ok_or_else(|| {
                RegistryError::CorruptSnapshot(format!("member {id} has no validator record"))
            })?;
            ordered.push((id, record));
        }
        if !by_address.is_empty() {
            return Err(RegistryError::CorruptSnapshot(
                "validator records outside the membership list".into(),
            ));
        }

        let state = RegistryState {
            stakes: StakeLedger::from_records(ordered)?,
            delegations: DelegationLedger::from_records(self.delegators)?,
            total_bonded: self.total_bonded,
        };
        if state.stakes.total_staked() != self.total_staked
            || state.delegations.total_stake_delegated() != self.total_stake_delegated
        {
            return Err(RegistryError::CorruptSnapshot(
                "accumulators disagree with records".into(),
            ));
        }
        state
            .check_invariants()
            .map_err(RegistryError::CorruptSnapshot)?;
        tracing::info!(
            validators = state.stakes.members().len(),
            total_bonded = %state.total_bonded,
            "registry restored from snapshot"
        );
        Ok(state)
    }
}
