use crate::{Epoch, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Identifies the block in effect at the start of `epoch`.
///
/// The root refers to the block at the epoch's start slot, or the latest
/// prior block if that slot was empty.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
    TreeHash,
)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

impl Checkpoint {
    pub fn new(epoch: Epoch, root: Hash256) -> Self {
        Self { epoch, root }
    }
}
