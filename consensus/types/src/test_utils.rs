//! Builders shared by the test suites of the downstream crates.

use crate::{
    BeaconBlock, BeaconBlockBody, BeaconState, ChainSpec, Epoch, EthSpec, Hash256,
    IndexedAttestation, SignatureBytes, SignedBeaconBlock, Slot, Validator, FAR_FUTURE_EPOCH,
};
use rand::Rng;

/// A random 32-byte root.
pub fn random_root() -> Hash256 {
    Hash256::from_slice(&rand::thread_rng().gen::<[u8; 32]>())
}

/// A validator with the canonical 32 ETH effective balance, active from
/// genesis and never exiting.
pub fn genesis_validator() -> Validator {
    Validator {
        effective_balance: 32_000_000_000,
        slashed: false,
        activation_epoch: Epoch::new(0),
        exit_epoch: FAR_FUTURE_EPOCH,
    }
}

/// A genesis state with `validator_count` interop-style validators.
pub fn genesis_state<E: EthSpec>(validator_count: usize, spec: &ChainSpec) -> BeaconState<E> {
    let mut state = BeaconState::new(0, spec);
    for _ in 0..validator_count {
        state.validators.push(genesis_validator());
        state.balances.push(32_000_000_000);
    }
    state
}

/// A genesis block/state pair wired the way block import expects: the state
/// holds the genesis block's header (state root zeroed) and the block commits
/// to the resulting state root.
pub fn genesis<E: EthSpec>(
    validator_count: usize,
    spec: &ChainSpec,
) -> (SignedBeaconBlock, BeaconState<E>) {
    let mut state = genesis_state::<E>(validator_count, spec);
    let mut block = SignedBeaconBlock::default();

    state.latest_block_header = block.message.temporary_block_header();
    block.message.state_root = state.canonical_root();

    (block, state)
}

/// An empty (no attestations) signed block at `slot` on top of `parent_root`.
pub fn empty_block(slot: Slot, parent_root: Hash256) -> SignedBeaconBlock {
    SignedBeaconBlock {
        message: BeaconBlock {
            slot,
            proposer_index: slot.as_u64() % 16,
            parent_root,
            state_root: Hash256::zero(),
            body: BeaconBlockBody::default(),
        },
        signature: SignatureBytes::empty(),
    }
}

/// A block at `slot` carrying the given attestations.
pub fn block_with_attestations(
    slot: Slot,
    parent_root: Hash256,
    attestations: Vec<IndexedAttestation>,
) -> SignedBeaconBlock {
    let mut block = empty_block(slot, parent_root);
    block.message.body.attestations = attestations;
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MinimalEthSpec;

    #[test]
    fn genesis_pair_is_consistent() {
        let spec = ChainSpec::minimal();
        let (block, state) = genesis::<MinimalEthSpec>(4, &spec);

        assert_eq!(block.message.state_root, state.canonical_root());
        assert_eq!(state.latest_block_header.state_root, Hash256::zero());
        assert_eq!(state.validators.len(), 4);
    }

    #[test]
    fn random_roots_differ() {
        assert_ne!(random_root(), random_root());
    }
}
