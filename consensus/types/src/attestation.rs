use crate::hashing::{container_tree_hash_root, list_tree_hash_root};
use crate::{Checkpoint, Hash256, Slot, ValidatorIndex};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// The vote carried by an attestation: a head block plus the FFG source and
/// target checkpoints.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
    TreeHash,
)]
pub struct AttestationData {
    pub slot: Slot,
    pub beacon_block_root: Hash256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

/// An attestation with its committee resolved to validator indices.
///
/// Aggregation-bit expansion and signature checks happen behind the external
/// committee/BLS seam; the chain core only ever sees the indexed form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct IndexedAttestation {
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
}

impl_container_tree_hash!(IndexedAttestation, self, {
    container_tree_hash_root(&[
        &list_tree_hash_root(&self.attesting_indices),
        &self.data.tree_hash_root(),
    ])
});

/// An attestation recorded in the state, pending epoch processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PendingAttestation {
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub inclusion_delay: u64,
}

impl_container_tree_hash!(PendingAttestation, self, {
    container_tree_hash_root(&[
        &list_tree_hash_root(&self.attesting_indices),
        &self.data.tree_hash_root(),
        &self.inclusion_delay.tree_hash_root(),
    ])
});
