//! The hot chain store.
//!
//! Holds every non-finalized block with its post-state, the block tree they
//! form, the fork-choice checkpoints and the latest-message vote table. One
//! writer mutates it through [`Transaction`]s; readers take point-in-time
//! snapshots under the read half of the lock.
//!
//! Durability is not this crate's job: every commit is mirrored onto the
//! [`StorageUpdate`] stream and the backend consuming that stream owns the
//! on-disk layout.

#[macro_use]
extern crate lazy_static;

pub mod block_tree;
pub mod chain_reader;
pub mod errors;
pub mod events;
mod metrics;
pub mod transaction;

use parking_lot::RwLock;
use slog::{debug, Logger};
use std::collections::HashMap;
use tokio::sync::mpsc;
use types::{
    BeaconState, Checkpoint, EthSpec, Gwei, Hash256, SignedBeaconBlock, Slot, ValidatorIndex,
    Vote,
};

pub use crate::block_tree::{BlockTree, BlockTreeError, ReRooted};
pub use crate::chain_reader::ChainReader;
pub use crate::errors::StoreError;
pub use crate::events::{FinalizedData, StorageUpdate};
pub use crate::transaction::Transaction;

/// The block fork choice most recently declared canonical, together with the
/// slot it was declared at. The slot can run ahead of the block's own slot
/// when slots are empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestBlock {
    pub root: Hash256,
    pub slot: Slot,
}

/// Everything head selection needs, captured under one read lock so the
/// result is a consistent snapshot.
#[derive(Debug, Clone)]
pub struct HeadSelectionView {
    pub tree: BlockTree,
    pub votes: HashMap<ValidatorIndex, Vote>,
    pub justified_checkpoint: Checkpoint,
    /// Effective balance per validator index in the justified state; zero
    /// for inactive validators.
    pub justified_balances: Vec<Gwei>,
    pub best_block: BestBlock,
    pub time: Slot,
}

pub(crate) struct StoreInner<E: EthSpec> {
    pub time: Slot,
    pub genesis_time: u64,
    pub justified_checkpoint: Checkpoint,
    pub best_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub finalized_block: SignedBeaconBlock,
    pub finalized_state: BeaconState<E>,
    pub best_block: BestBlock,
    pub blocks: HashMap<Hash256, SignedBeaconBlock>,
    pub block_states: HashMap<Hash256, BeaconState<E>>,
    pub block_tree: BlockTree,
    pub votes: HashMap<ValidatorIndex, Vote>,
    /// state root → block root
    pub state_roots: HashMap<Hash256, Hash256>,
}

pub struct Store<E: EthSpec> {
    pub(crate) inner: RwLock<StoreInner<E>>,
    pub(crate) storage_tx: mpsc::UnboundedSender<StorageUpdate<E>>,
    pub(crate) log: Logger,
}

impl<E: EthSpec> Store<E> {
    /// Creates a store anchored at a finalized block/state pair, most
    /// commonly genesis. Returns the receiving half of the storage event
    /// stream.
    pub fn from_anchor(
        anchor_block: SignedBeaconBlock,
        anchor_state: BeaconState<E>,
        log: Logger,
    ) -> (Self, mpsc::UnboundedReceiver<StorageUpdate<E>>) {
        let anchor_root = anchor_block.canonical_root();
        let checkpoint = Checkpoint::new(anchor_state.current_epoch(), anchor_root);

        let mut blocks = HashMap::new();
        blocks.insert(anchor_root, anchor_block.clone());
        let mut block_states = HashMap::new();
        block_states.insert(anchor_root, anchor_state.clone());
        let mut state_roots = HashMap::new();
        state_roots.insert(anchor_block.message.state_root, anchor_root);

        let inner = StoreInner {
            time: anchor_state.slot,
            genesis_time: anchor_state.genesis_time,
            justified_checkpoint: checkpoint,
            best_justified_checkpoint: checkpoint,
            finalized_checkpoint: checkpoint,
            finalized_block: anchor_block.clone(),
            finalized_state: anchor_state,
            best_block: BestBlock {
                root: anchor_root,
                slot: anchor_block.slot(),
            },
            blocks,
            block_states,
            block_tree: BlockTree::new(anchor_root, anchor_block.slot()),
            votes: HashMap::new(),
            state_roots,
        };

        let (storage_tx, storage_rx) = mpsc::unbounded_channel();

        debug!(
            log, "Store initialized";
            "anchor_root" => ?anchor_root,
            "anchor_slot" => %anchor_block.slot(),
        );

        (
            Self {
                inner: RwLock::new(inner),
                storage_tx,
                log,
            },
            storage_rx,
        )
    }

    /// Opens a transaction. Mutations stage privately and apply on commit;
    /// a dropped transaction has no effect.
    pub fn transaction(&self) -> Transaction<'_, E> {
        Transaction::new(self)
    }

    /*
     * Snapshot reads. Each call observes the store as of some single point
     * in time.
     */

    pub fn time(&self) -> Slot {
        self.inner.read().time
    }

    pub fn genesis_time(&self) -> u64 {
        self.inner.read().genesis_time
    }

    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.inner.read().justified_checkpoint
    }

    pub fn best_justified_checkpoint(&self) -> Checkpoint {
        self.inner.read().best_justified_checkpoint
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.inner.read().finalized_checkpoint
    }

    pub fn finalized_slot(&self) -> Slot {
        self.inner.read().finalized_block.slot()
    }

    pub fn finalized_block(&self) -> SignedBeaconBlock {
        self.inner.read().finalized_block.clone()
    }

    pub fn best_block(&self) -> BestBlock {
        self.inner.read().best_block
    }

    pub fn contains_block(&self, root: Hash256) -> bool {
        self.inner.read().blocks.contains_key(&root)
    }

    pub fn block(&self, root: Hash256) -> Option<SignedBeaconBlock> {
        self.inner.read().blocks.get(&root).cloned()
    }

    pub fn block_state(&self, root: Hash256) -> Option<BeaconState<E>> {
        self.inner.read().block_states.get(&root).cloned()
    }

    pub fn block_slot(&self, root: Hash256) -> Option<Slot> {
        self.inner.read().block_tree.slot_of(root)
    }

    pub fn block_root_by_state_root(&self, state_root: Hash256) -> Option<Hash256> {
        self.inner.read().state_roots.get(&state_root).copied()
    }

    pub fn hot_block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }

    pub fn votes(&self) -> HashMap<ValidatorIndex, Vote> {
        self.inner.read().votes.clone()
    }

    pub fn vote_for(&self, validator: ValidatorIndex) -> Option<Vote> {
        self.inner.read().votes.get(&validator).copied()
    }

    pub fn is_descendant(&self, ancestor: Hash256, descendant: Hash256) -> bool {
        self.inner.read().block_tree.is_descendant(ancestor, descendant)
    }

    /// The most recent block at or before `slot` on the ancestry of `root`.
    pub fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, StoreError> {
        self.inner
            .read()
            .block_tree
            .ancestor_at_slot(root, slot)
            .map_err(Into::into)
    }

    /// The block in effect at `slot` on the canonical (head) chain.
    ///
    /// Slots below the finalized block are answered from the finalized
    /// state's root history; asking beyond that history is a fatal condition
    /// for callers that require the answer to exist.
    pub fn block_root_in_effect_at_slot(&self, slot: Slot) -> Result<Hash256, StoreError> {
        let inner = self.inner.read();

        if slot >= inner.finalized_block.slot() {
            inner
                .block_tree
                .ancestor_at_slot(inner.best_block.root, slot)
                .map_err(Into::into)
        } else {
            inner
                .finalized_state
                .get_block_root_at_slot(slot)
                .map_err(|_| StoreError::HistoricalBlockUnavailable(slot))
        }
    }

    /// Captures everything LMD-GHOST needs in one consistent snapshot.
    pub fn head_selection_view(&self) -> Result<HeadSelectionView, StoreError> {
        let inner = self.inner.read();

        let justified_state = inner
            .block_states
            .get(&inner.justified_checkpoint.root)
            .ok_or(StoreError::MissingState(inner.justified_checkpoint.root))?;

        let epoch = justified_state.current_epoch();
        let justified_balances = justified_state
            .validators
            .iter()
            .map(|validator| {
                if validator.is_active_at(epoch) {
                    validator.effective_balance
                } else {
                    0
                }
            })
            .collect();

        Ok(HeadSelectionView {
            tree: inner.block_tree.clone(),
            votes: inner.votes.clone(),
            justified_checkpoint: inner.justified_checkpoint,
            justified_balances,
            best_block: inner.best_block,
            time: inner.time,
        })
    }
}

impl From<BlockTreeError> for StoreError {
    fn from(e: BlockTreeError) -> Self {
        match e {
            BlockTreeError::UnknownParent {
                block_root,
                parent_root,
            } => StoreError::UnknownParent {
                block_root,
                parent_root,
            },
            BlockTreeError::UnknownBlock(root) | BlockTreeError::UnknownNewRoot(root) => {
                StoreError::UnknownBlock(root)
            }
        }
    }
}
