use crate::{Epoch, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// A 4-byte fork protocol version.
pub type ForkVersion = [u8; 4];

/// A 4-byte tag identifying the fork protocol in force. Peers whose digest
/// differs from ours follow an incompatible rule set.
pub type ForkDigest = [u8; 4];

/// Fork scheduling information carried in the beacon state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct Fork {
    pub previous_version: ForkVersion,
    pub current_version: ForkVersion,
    pub epoch: Epoch,
}

/// Input to the fork digest computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode, TreeHash)]
pub struct ForkData {
    pub current_version: ForkVersion,
    pub genesis_validators_root: Hash256,
}

/// Returns the 4-byte fork digest for `current_version` and
/// `genesis_validators_root`: the leading bytes of the `ForkData` root.
pub fn compute_fork_digest(
    current_version: ForkVersion,
    genesis_validators_root: Hash256,
) -> ForkDigest {
    let root = ForkData {
        current_version,
        genesis_validators_root,
    }
    .tree_hash_root();

    let mut digest = [0; 4];
    digest.copy_from_slice(&root[..4]);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_version() {
        let root = Hash256::zero();
        assert_ne!(
            compute_fork_digest([0, 0, 0, 0], root),
            compute_fork_digest([0, 0, 0, 1], root)
        );
    }

    #[test]
    fn digest_depends_on_genesis_validators_root() {
        let version = [1, 2, 3, 4];
        assert_ne!(
            compute_fork_digest(version, Hash256::zero()),
            compute_fork_digest(version, Hash256::repeat_byte(1))
        );
    }
}
