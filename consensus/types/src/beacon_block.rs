use crate::hashing::{container_tree_hash_root, list_tree_hash_root};
use crate::{Hash256, IndexedAttestation, SignatureBytes, Slot, ValidatorIndex};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;

/// The payload of a beacon block, trimmed to the attestations the chain core
/// consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BeaconBlockBody {
    pub attestations: Vec<IndexedAttestation>,
}

impl_container_tree_hash!(BeaconBlockBody, self, {
    list_tree_hash_root(&self.attestations)
});

/// A beacon block. Identity is the tree hash of this container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
}

// Hashes the same five field roots as `BeaconBlockHeader` so that a block and
// its header always share a canonical root.
impl_container_tree_hash!(BeaconBlock, self, {
    container_tree_hash_root(&[
        &self.slot.tree_hash_root(),
        &self.proposer_index.tree_hash_root(),
        &self.parent_root.tree_hash_root(),
        &self.state_root.tree_hash_root(),
        &self.body.tree_hash_root(),
    ])
});

impl BeaconBlock {
    /// Returns the tree hash of the block.
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.tree_hash_root()[..])
    }

    /// Returns the header corresponding to this block.
    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: Hash256::from_slice(&self.body.tree_hash_root()[..]),
        }
    }

    /// Returns the header with a zeroed state root, as stored in the state
    /// until the next slot's processing fills it in.
    pub fn temporary_block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            state_root: Hash256::zero(),
            ..self.block_header()
        }
    }
}

/// A header of a `BeaconBlock`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body_root: Hash256,
}

impl_container_tree_hash!(BeaconBlockHeader, self, {
    container_tree_hash_root(&[
        &self.slot.tree_hash_root(),
        &self.proposer_index.tree_hash_root(),
        &self.parent_root.tree_hash_root(),
        &self.state_root.tree_hash_root(),
        &self.body_root.tree_hash_root(),
    ])
});

impl BeaconBlockHeader {
    /// Returns the tree hash of the header.
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.tree_hash_root()[..])
    }
}

/// A block with the proposer's signature attached. The signature is opaque
/// bytes; verification happens behind the BLS seam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

impl SignedBeaconBlock {
    /// Returns the tree hash of the inner block, ignoring the signature.
    pub fn canonical_root(&self) -> Hash256 {
        self.message.canonical_root()
    }

    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    pub fn parent_root(&self) -> Hash256 {
        self.message.parent_root
    }
}
