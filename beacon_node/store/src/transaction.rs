//! Staged store mutations.
//!
//! A transaction owns a private overlay of the store. Reads through the
//! transaction see the overlay first, then the committed data, so code that
//! stages a block can immediately reason about the chain as if the block
//! were present. `commit` validates the whole batch, applies it under one
//! write section and emits the matching [`StorageUpdate`]. Dropping an
//! uncommitted transaction discards the overlay.

use crate::events::{FinalizedData, StorageUpdate};
use crate::metrics;
use crate::{BestBlock, Store, StoreError};
use slog::{debug, trace, warn};
use std::collections::{HashMap, HashSet};
use types::{
    BeaconState, Checkpoint, EthSpec, Hash256, SignedBeaconBlock, Slot, ValidatorIndex, Vote,
};

pub struct Transaction<'a, E: EthSpec> {
    store: &'a Store<E>,
    time: Option<Slot>,
    genesis_time: Option<u64>,
    justified_checkpoint: Option<Checkpoint>,
    best_justified_checkpoint: Option<Checkpoint>,
    finalized: Option<FinalizedData<E>>,
    best_block: Option<BestBlock>,
    blocks: HashMap<Hash256, SignedBeaconBlock>,
    block_states: HashMap<Hash256, BeaconState<E>>,
    states_to_persist: HashSet<Hash256>,
    votes: HashMap<ValidatorIndex, Vote>,
    state_roots: HashMap<Hash256, Hash256>,
}

impl<'a, E: EthSpec> Transaction<'a, E> {
    pub(crate) fn new(store: &'a Store<E>) -> Self {
        Self {
            store,
            time: None,
            genesis_time: None,
            justified_checkpoint: None,
            best_justified_checkpoint: None,
            finalized: None,
            best_block: None,
            blocks: HashMap::new(),
            block_states: HashMap::new(),
            states_to_persist: HashSet::new(),
            votes: HashMap::new(),
            state_roots: HashMap::new(),
        }
    }

    /*
     * Overlay reads.
     */

    pub fn time(&self) -> Slot {
        self.time.unwrap_or_else(|| self.store.time())
    }

    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
            .unwrap_or_else(|| self.store.justified_checkpoint())
    }

    pub fn best_justified_checkpoint(&self) -> Checkpoint {
        self.best_justified_checkpoint
            .unwrap_or_else(|| self.store.best_justified_checkpoint())
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized
            .as_ref()
            .map(|finalized| finalized.checkpoint)
            .unwrap_or_else(|| self.store.finalized_checkpoint())
    }

    pub fn best_block(&self) -> BestBlock {
        self.best_block.unwrap_or_else(|| self.store.best_block())
    }

    pub fn contains_block(&self, root: Hash256) -> bool {
        self.blocks.contains_key(&root) || self.store.contains_block(root)
    }

    pub fn block(&self, root: Hash256) -> Option<SignedBeaconBlock> {
        self.blocks
            .get(&root)
            .cloned()
            .or_else(|| self.store.block(root))
    }

    pub fn block_state(&self, root: Hash256) -> Option<BeaconState<E>> {
        self.block_states
            .get(&root)
            .cloned()
            .or_else(|| self.store.block_state(root))
    }

    pub fn block_slot(&self, root: Hash256) -> Option<Slot> {
        self.blocks
            .get(&root)
            .map(|block| block.slot())
            .or_else(|| self.store.block_slot(root))
    }

    pub fn vote(&self, validator: ValidatorIndex) -> Option<Vote> {
        self.votes
            .get(&validator)
            .copied()
            .or_else(|| self.store.vote_for(validator))
    }

    /// Walks ancestry through the overlay and on into the committed tree.
    pub fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, StoreError> {
        let mut current = root;
        loop {
            match self.blocks.get(&current) {
                Some(block) if block.slot() <= slot => return Ok(current),
                Some(block) => current = block.parent_root(),
                None => return self.store.ancestor_at_slot(current, slot),
            }
        }
    }

    /*
     * Staging.
     */

    pub fn set_time(&mut self, time: Slot) {
        self.time = Some(time);
    }

    pub fn set_genesis_time(&mut self, genesis_time: u64) {
        self.genesis_time = Some(genesis_time);
    }

    pub fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.justified_checkpoint = Some(checkpoint);
    }

    pub fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.best_justified_checkpoint = Some(checkpoint);
    }

    pub fn set_best_block(&mut self, root: Hash256, slot: Slot) {
        self.best_block = Some(BestBlock { root, slot });
    }

    pub fn set_finalized_data(
        &mut self,
        checkpoint: Checkpoint,
        block: SignedBeaconBlock,
        state: BeaconState<E>,
    ) {
        self.finalized = Some(FinalizedData {
            checkpoint,
            block,
            state,
        });
    }

    /// Stages a hot block with its post-state. `persist_state` flags the
    /// state for inclusion in the durable snapshot.
    pub fn put_block(
        &mut self,
        root: Hash256,
        block: SignedBeaconBlock,
        state: BeaconState<E>,
        persist_state: bool,
    ) {
        self.state_roots.insert(block.message.state_root, root);
        self.blocks.insert(root, block);
        self.block_states.insert(root, state);
        if persist_state {
            self.states_to_persist.insert(root);
        }
    }

    /// Stages a vote, keeping the higher-epoch message per validator.
    pub fn put_vote(&mut self, validator: ValidatorIndex, vote: Vote) {
        match self.vote(validator) {
            Some(existing) if !existing.should_be_replaced_by(&vote) => {
                trace!(
                    self.store.log, "Stale vote ignored";
                    "validator" => validator,
                    "epoch" => %vote.epoch,
                );
            }
            _ => {
                self.votes.insert(validator, vote);
            }
        }
    }

    /// Validates the staged batch and applies it atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        let Transaction {
            store,
            time,
            genesis_time,
            justified_checkpoint,
            best_justified_checkpoint,
            finalized,
            best_block,
            blocks,
            block_states,
            states_to_persist,
            votes,
            state_roots,
        } = self;

        let mut inner = store.inner.write();
        let _timer = metrics::start_timer(&metrics::TRANSACTION_COMMIT_SECONDS);

        /*
         * Validate the whole batch before mutating anything.
         */

        let mut ordered_blocks: Vec<_> = blocks.iter().collect();
        ordered_blocks.sort_by_key(|(_, block)| block.slot());

        for (root, block) in &ordered_blocks {
            let parent = block.parent_root();
            if !inner.block_tree.contains(parent) && !blocks.contains_key(&parent) {
                return Err(StoreError::UnknownParent {
                    block_root: **root,
                    parent_root: parent,
                });
            }
        }

        if let Some(finalized_data) = &finalized {
            let current = inner.finalized_checkpoint;
            if finalized_data.checkpoint.epoch < current.epoch {
                return Err(StoreError::FinalizedCheckpointReverted {
                    current_epoch: current.epoch,
                    new_epoch: finalized_data.checkpoint.epoch,
                });
            }
            let new_root = finalized_data.checkpoint.root;
            if !inner.block_tree.contains(new_root) && !blocks.contains_key(&new_root) {
                return Err(StoreError::UnknownBlock(new_root));
            }
        }

        /*
         * Apply.
         */

        if let Some(time) = time {
            inner.time = time;
        }
        if let Some(genesis_time) = genesis_time {
            inner.genesis_time = genesis_time;
        }
        if let Some(checkpoint) = justified_checkpoint {
            inner.justified_checkpoint = checkpoint;
        }
        if let Some(checkpoint) = best_justified_checkpoint {
            // Monotone non-decreasing by epoch.
            if checkpoint.epoch >= inner.best_justified_checkpoint.epoch {
                inner.best_justified_checkpoint = checkpoint;
            }
        }
        if let Some(best_block) = best_block {
            inner.best_block = best_block;
        }

        for (root, block) in ordered_blocks {
            inner
                .block_tree
                .insert(*root, block.slot(), block.parent_root())?;
        }
        for (root, block) in &blocks {
            inner.blocks.insert(*root, block.clone());
        }
        for (root, state) in &block_states {
            inner.block_states.insert(*root, state.clone());
        }
        for (state_root, block_root) in &state_roots {
            inner.state_roots.insert(*state_root, *block_root);
        }

        for (validator, vote) in &votes {
            let replace = inner
                .votes
                .get(validator)
                .map_or(true, |existing| existing.should_be_replaced_by(vote));
            if replace {
                inner.votes.insert(*validator, *vote);
            }
        }

        let mut pruned_roots = vec![];
        if let Some(finalized_data) = &finalized {
            let new_root = finalized_data.checkpoint.root;
            let re_rooted = inner.block_tree.re_root(new_root)?;

            for root in re_rooted
                .pruned
                .iter()
                .chain(re_rooted.finalized_chain.iter())
            {
                if let Some(block) = inner.blocks.remove(root) {
                    inner.state_roots.remove(&block.message.state_root);
                }
                inner.block_states.remove(root);
            }
            metrics::inc_counter_by(
                &metrics::PRUNED_BLOCKS_TOTAL,
                re_rooted.pruned.len() as u64,
            );
            pruned_roots = re_rooted.pruned;

            inner.finalized_checkpoint = finalized_data.checkpoint;
            inner.finalized_block = finalized_data.block.clone();
            inner.finalized_state = finalized_data.state.clone();

            debug!(
                store.log, "Finalization advanced";
                "epoch" => %finalized_data.checkpoint.epoch,
                "root" => ?new_root,
                "pruned" => pruned_roots.len(),
            );
        }

        metrics::inc_counter(&metrics::TRANSACTION_COMMITS_TOTAL);
        metrics::set_gauge(&metrics::HOT_BLOCKS_TOTAL, inner.blocks.len() as i64);

        /*
         * Mirror the commit onto the storage stream.
         */

        let hot_states_to_persist = states_to_persist
            .iter()
            .filter_map(|root| block_states.get(root).map(|state| (*root, state.clone())))
            .collect();

        let update = StorageUpdate {
            time,
            genesis_time,
            justified_checkpoint,
            best_justified_checkpoint,
            finalized_data: finalized,
            hot_blocks: blocks,
            hot_states_to_persist,
            pruned_hot_block_roots: pruned_roots,
            votes,
            state_roots,
        };

        if !update.is_empty() && store.storage_tx.send(update).is_err() {
            warn!(
                store.log,
                "Storage update dropped; no consumer on the storage stream"
            );
        }

        Ok(())
    }
}
