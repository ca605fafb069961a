//! The storage event stream.
//!
//! Every transaction commit emits exactly one `StorageUpdate`. The durable
//! backend consumes them asynchronously and applies them idempotently, in
//! order; together they are the source of truth for recovery.

use std::collections::HashMap;
use types::{
    BeaconState, Checkpoint, EthSpec, Hash256, SignedBeaconBlock, Slot, ValidatorIndex, Vote,
};

/// The finalized checkpoint together with its chain data.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedData<E: EthSpec> {
    pub checkpoint: Checkpoint,
    pub block: SignedBeaconBlock,
    pub state: BeaconState<E>,
}

/// The staged mutations applied by one transaction commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUpdate<E: EthSpec> {
    pub time: Option<Slot>,
    pub genesis_time: Option<u64>,
    pub justified_checkpoint: Option<Checkpoint>,
    pub best_justified_checkpoint: Option<Checkpoint>,
    pub finalized_data: Option<FinalizedData<E>>,
    /// Every hot block added by this commit.
    pub hot_blocks: HashMap<Hash256, SignedBeaconBlock>,
    /// The subset of new hot states flagged for disk persistence.
    pub hot_states_to_persist: HashMap<Hash256, BeaconState<E>>,
    /// Hot blocks (and their states) deleted by finalization pruning.
    pub pruned_hot_block_roots: Vec<Hash256>,
    pub votes: HashMap<ValidatorIndex, Vote>,
    /// New state-root → block-root index entries.
    pub state_roots: HashMap<Hash256, Hash256>,
}

impl<E: EthSpec> StorageUpdate<E> {
    pub fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.genesis_time.is_none()
            && self.justified_checkpoint.is_none()
            && self.best_justified_checkpoint.is_none()
            && self.finalized_data.is_none()
            && self.hot_blocks.is_empty()
            && self.hot_states_to_persist.is_empty()
            && self.pruned_hot_block_roots.is_empty()
            && self.votes.is_empty()
            && self.state_roots.is_empty()
    }
}

impl<E: EthSpec> Default for StorageUpdate<E> {
    fn default() -> Self {
        Self {
            time: None,
            genesis_time: None,
            justified_checkpoint: None,
            best_justified_checkpoint: None,
            finalized_data: None,
            hot_blocks: HashMap::new(),
            hot_states_to_persist: HashMap::new(),
            pruned_hot_block_roots: vec![],
            votes: HashMap::new(),
            state_roots: HashMap::new(),
        }
    }
}
