use crate::{Epoch, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A validator's latest attestation message, as tracked by fork choice.
///
/// Updated monotonically: a vote only replaces an earlier one when its epoch
/// is strictly higher.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct Vote {
    pub root: Hash256,
    pub epoch: Epoch,
}

impl Vote {
    pub fn new(root: Hash256, epoch: Epoch) -> Self {
        Self { root, epoch }
    }

    /// Returns `true` if `other` should replace `self` under LMD rules.
    pub fn should_be_replaced_by(&self, other: &Vote) -> bool {
        other.epoch > self.epoch
    }
}
