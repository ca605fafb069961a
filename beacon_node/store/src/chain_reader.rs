//! A read-only view over the chain, combining store snapshots with the slot
//! clock. Peer validation and the duty pipeline consume the chain through
//! this facade rather than touching the store directly.

use crate::{Store, StoreError};
use slot_clock::SlotClock;
use std::sync::Arc;
use types::{Checkpoint, Epoch, EthSpec, ForkDigest, Hash256, SignedBeaconBlock, Slot};

pub struct ChainReader<E: EthSpec, S: SlotClock> {
    store: Arc<Store<E>>,
    slot_clock: S,
}

impl<E: EthSpec, S: SlotClock> ChainReader<E, S> {
    pub fn new(store: Arc<Store<E>>, slot_clock: S) -> Self {
        Self { store, slot_clock }
    }

    /// The wall-clock slot, clamped to genesis before the chain starts.
    pub fn current_slot(&self) -> Slot {
        self.slot_clock
            .now()
            .unwrap_or_else(|| self.slot_clock.genesis_slot())
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current_slot().epoch(E::slots_per_epoch())
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store.finalized_checkpoint()
    }

    pub fn finalized_slot(&self) -> Slot {
        self.store.finalized_slot()
    }

    pub fn head_root(&self) -> Hash256 {
        self.store.best_block().root
    }

    pub fn head_slot(&self) -> Slot {
        self.store.best_block().slot
    }

    /// The fork digest in force on the canonical head.
    pub fn fork_digest(&self) -> Result<ForkDigest, StoreError> {
        let head = self.store.best_block().root;
        self.store
            .block_state(head)
            .map(|state| state.fork_digest())
            .ok_or(StoreError::MissingState(head))
    }

    /// The most recent canonical block at or before `slot`.
    pub fn block_root_in_effect_at_slot(&self, slot: Slot) -> Result<Hash256, StoreError> {
        self.store.block_root_in_effect_at_slot(slot)
    }

    pub fn block(&self, root: Hash256) -> Option<SignedBeaconBlock> {
        self.store.block(root)
    }

    pub fn store(&self) -> &Arc<Store<E>> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::null_logger;
    use slot_clock::ManualSlotClock;
    use std::time::Duration;
    use types::test_utils::{empty_block, genesis};
    use types::{ChainSpec, MinimalEthSpec};

    type E = MinimalEthSpec;

    fn reader_at_slot(slot: u64) -> (ChainReader<E, ManualSlotClock>, SignedBeaconBlock) {
        let (block, state) = genesis::<E>(4, &ChainSpec::minimal());
        let (store, _rx) = Store::from_anchor(block.clone(), state, null_logger());
        let clock = ManualSlotClock::new(
            Slot::new(0),
            Duration::from_secs(0),
            Duration::from_secs(6),
        );
        clock.set_slot(Slot::new(slot));
        (ChainReader::new(Arc::new(store), clock), block)
    }

    #[test]
    fn clock_drives_epoch() {
        let (reader, _) = reader_at_slot(2 * E::slots_per_epoch() + 1);
        assert_eq!(reader.current_epoch(), Epoch::new(2));
    }

    #[test]
    fn block_in_effect_walks_canonical_chain() {
        let (reader, genesis_block) = reader_at_slot(4);
        let genesis_root = genesis_block.canonical_root();

        let block = empty_block(Slot::new(2), genesis_root);
        let mut tx = reader.store().transaction();
        let state = reader.store().block_state(genesis_root).unwrap();
        tx.put_block(block.canonical_root(), block.clone(), state, false);
        tx.set_best_block(block.canonical_root(), Slot::new(2));
        tx.commit().unwrap();

        // Exactly at the block's slot, and across the empty slot after it.
        assert_eq!(
            reader.block_root_in_effect_at_slot(Slot::new(2)).unwrap(),
            block.canonical_root()
        );
        assert_eq!(
            reader.block_root_in_effect_at_slot(Slot::new(3)).unwrap(),
            block.canonical_root()
        );
        assert_eq!(
            reader.block_root_in_effect_at_slot(Slot::new(1)).unwrap(),
            genesis_root
        );
    }

    #[test]
    fn fork_digest_comes_from_head_state() {
        let (reader, _) = reader_at_slot(0);
        assert_eq!(
            reader.fork_digest().unwrap(),
            types::compute_fork_digest([0, 0, 0, 1], Hash256::zero())
        );
    }
}
