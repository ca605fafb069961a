//! The fork choice engine.
//!
//! Wraps the hot [`Store`] and decides which block is the canonical head:
//!
//! - `on_block` imports a block (state transition included) and takes the
//!   fast path when the block extends the current head.
//! - `process_head` runs the LMD-GHOST walk over the hot tree.
//! - `on_attestation` folds latest-message votes into the vote table.
//!
//! Whenever the declared best block moves laterally a [`ReorgEvent`] is
//! broadcast. Moving laterally means the new best block is not what the old
//! best chain had in effect at the new best slot; advancing the slot counter
//! over empty slots is not a reorg, while filling a slot that had been
//! declared empty is.

use crate::events::{EventHandler, EventKind, HeadEvent, ReorgEvent};
use crate::metrics;
use slog::{debug, trace, warn, Logger};
use slot_clock::SlotClock;
use ssz_derive::{Decode, Encode};
use state_processing::{
    per_block_processing, process_slots, BlockProcessingError, SlotProcessingError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::{HeadSelectionView, Store, StoreError, Transaction};
use types::{
    BeaconState, Checkpoint, Epoch, EthSpec, Gwei, Hash256, IndexedAttestation,
    SignedBeaconBlock, Slot, Vote,
};

/// Bound inside which a conflicting justified checkpoint may replace the
/// current one without waiting for the epoch boundary.
///
/// See <https://ethresear.ch/t/prevention-of-bouncing-attack-on-ffg/6114>.
pub const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 8;

/// Engine-internal failures. `Store`-level corruption poisons the engine:
/// further imports are refused until restart.
#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    Store(StoreError),
    /// A prior local-invariant violation has latched the engine off.
    EngineSuspended,
    /// A block that must be hot is missing.
    MissingBlock(Hash256),
    /// A hot block is missing its post-state.
    MissingState(Hash256),
    InvalidAttestation(InvalidAttestation),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl From<InvalidAttestation> for Error {
    fn from(e: InvalidAttestation) -> Self {
        Error::InvalidAttestation(e)
    }
}

/// Rejections and failures surfaced by `on_block`. The store is untouched in
/// every case.
#[derive(Debug, PartialEq, Clone)]
pub enum BlockError {
    /// The block's slot is beyond the wall clock; the caller may retry once
    /// the slot arrives.
    BlockIsFromFuture { block_slot: Slot, current_slot: Slot },
    /// The parent is neither hot nor the finalized block; the caller may
    /// retry after syncing the parent.
    ParentUnknown { parent_root: Hash256 },
    InvalidBlock(InvalidBlock),
    FailedStateTransition(TransitionCause),
    Internal(Error),
}

#[derive(Debug, PartialEq, Clone)]
pub enum InvalidBlock {
    /// The block is at or below the finalized slot.
    SlotBeforeFinalized { block_slot: Slot, finalized_slot: Slot },
    /// The block does not descend from the finalized block.
    NotDescendantOfFinalized { block_root: Hash256 },
}

#[derive(Debug, PartialEq, Clone)]
pub enum TransitionCause {
    Slot(SlotProcessingError),
    Block(BlockProcessingError),
}

impl From<Error> for BlockError {
    fn from(e: Error) -> Self {
        BlockError::Internal(e)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum InvalidAttestation {
    EmptyAttestingIndices,
    /// The `attestation.data.beacon_block_root` block is unknown.
    UnknownHeadBlock { beacon_block_root: Hash256 },
    /// The attestation slot is not in the target epoch.
    BadTargetEpoch,
    /// The target epoch is ahead of the wall clock.
    FutureEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The target epoch is before the previous epoch.
    PastEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The attestation names a head block from after its own slot.
    AttestsToFutureBlock { block: Slot, attestation: Slot },
}

/// The result of a successful `on_block` call.
#[derive(Debug, PartialEq, Clone)]
pub enum ImportOutcome {
    Imported { head_root: Hash256 },
    /// The block was already hot; nothing changed.
    AlreadyKnown { head_root: Hash256 },
}

impl ImportOutcome {
    pub fn head_root(&self) -> Hash256 {
        match self {
            ImportOutcome::Imported { head_root } => *head_root,
            ImportOutcome::AlreadyKnown { head_root } => *head_root,
        }
    }
}

/// An attestation for the current slot, parked until its slot passes.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct QueuedAttestation {
    pub slot: Slot,
    pub attesting_indices: Vec<u64>,
    pub block_root: Hash256,
    pub target_epoch: Epoch,
}

impl From<&IndexedAttestation> for QueuedAttestation {
    fn from(a: &IndexedAttestation) -> Self {
        Self {
            slot: a.data.slot,
            attesting_indices: a.attesting_indices.clone(),
            block_root: a.data.beacon_block_root,
            target_epoch: a.data.target.epoch,
        }
    }
}

/// Returns all queued attestations whose slot is earlier than `current_slot`,
/// removing them from `queued_attestations`.
pub(crate) fn dequeue_attestations(
    current_slot: Slot,
    queued_attestations: &mut Vec<QueuedAttestation>,
) -> Vec<QueuedAttestation> {
    let remaining = queued_attestations.split_off(
        queued_attestations
            .iter()
            .position(|a| a.slot >= current_slot)
            .unwrap_or(queued_attestations.len()),
    );

    std::mem::replace(queued_attestations, remaining)
}

pub struct ForkChoice<E: EthSpec, S: SlotClock> {
    store: Arc<Store<E>>,
    slot_clock: S,
    events: Arc<EventHandler>,
    queued_attestations: parking_lot::Mutex<Vec<QueuedAttestation>>,
    poisoned: AtomicBool,
    log: Logger,
}

impl<E: EthSpec, S: SlotClock> ForkChoice<E, S> {
    pub fn new(store: Arc<Store<E>>, slot_clock: S, events: Arc<EventHandler>, log: Logger) -> Self {
        Self {
            store,
            slot_clock,
            events,
            queued_attestations: parking_lot::Mutex::new(vec![]),
            poisoned: AtomicBool::new(false),
            log,
        }
    }

    pub fn store(&self) -> &Arc<Store<E>> {
        &self.store
    }

    pub fn queued_attestation_count(&self) -> usize {
        self.queued_attestations.lock().len()
    }

    pub(crate) fn queued_attestations(&self) -> Vec<QueuedAttestation> {
        self.queued_attestations.lock().clone()
    }

    pub(crate) fn restore_queued_attestations(&self, queued: Vec<QueuedAttestation>) {
        *self.queued_attestations.lock() = queued;
    }

    fn check_active(&self) -> Result<(), Error> {
        if self.poisoned.load(Ordering::Relaxed) {
            Err(Error::EngineSuspended)
        } else {
            Ok(())
        }
    }

    /// Latches the engine off after a local-invariant violation.
    fn fatal(&self, error: Error) -> Error {
        warn!(
            self.log, "Engine suspended by local invariant violation";
            "error" => ?error,
        );
        self.poisoned.store(true, Ordering::Relaxed);
        error
    }

    fn current_wall_slot(&self) -> Slot {
        self.slot_clock
            .now()
            .unwrap_or_else(|| self.slot_clock.genesis_slot())
    }

    /// Brings the store's slot up to `current_slot`, promoting the best
    /// justified checkpoint on epoch boundaries and releasing queued
    /// attestations whose slot has passed.
    pub fn update_time(&self, current_slot: Slot) -> Result<Slot, Error> {
        while self.store.time() < current_slot {
            let next = self.store.time() + 1;
            self.on_tick(next)?;
        }

        self.process_attestation_queue()?;

        Ok(self.store.time())
    }

    fn on_tick(&self, time: Slot) -> Result<(), Error> {
        let mut tx = self.store.transaction();
        tx.set_time(time);

        // A better justified checkpoint learned mid-epoch takes effect on
        // the epoch boundary.
        if time % E::slots_per_epoch() == 0
            && tx.best_justified_checkpoint().epoch > tx.justified_checkpoint().epoch
        {
            let best = tx.best_justified_checkpoint();
            tx.set_justified_checkpoint(best);
        }

        tx.commit()?;
        Ok(())
    }

    fn process_attestation_queue(&self) -> Result<(), Error> {
        let dequeued = dequeue_attestations(
            self.store.time(),
            &mut self.queued_attestations.lock(),
        );
        if dequeued.is_empty() {
            return Ok(());
        }

        let mut tx = self.store.transaction();
        for attestation in dequeued {
            if !tx.contains_block(attestation.block_root) {
                trace!(
                    self.log, "Dequeued attestation names unknown block";
                    "block_root" => ?attestation.block_root,
                );
                continue;
            }
            for validator in attestation.attesting_indices.iter().copied() {
                tx.put_vote(
                    validator,
                    Vote::new(attestation.block_root, attestation.target_epoch),
                );
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Imports a block, computing its post-state from the parent's.
    ///
    /// `pre_state_hint` may carry the parent's post-state to skip the store
    /// fetch; it is ignored unless it actually matches the parent.
    pub fn on_block(
        &self,
        signed_block: &SignedBeaconBlock,
        pre_state_hint: Option<&BeaconState<E>>,
    ) -> Result<ImportOutcome, BlockError> {
        self.check_active().map_err(BlockError::Internal)?;
        let _timer = metrics::start_timer(&metrics::BLOCK_IMPORT_SECONDS);

        let result = self.import_block(signed_block, pre_state_hint);
        match &result {
            Ok(_) => metrics::inc_counter(&metrics::BLOCK_IMPORTS_TOTAL),
            Err(_) => metrics::inc_counter(&metrics::BLOCK_IMPORT_ERRORS_TOTAL),
        }
        result
    }

    fn import_block(
        &self,
        signed_block: &SignedBeaconBlock,
        pre_state_hint: Option<&BeaconState<E>>,
    ) -> Result<ImportOutcome, BlockError> {
        let block = &signed_block.message;
        let block_root = signed_block.canonical_root();

        let current_slot = self
            .update_time(self.current_wall_slot())
            .map_err(BlockError::Internal)?;

        // Blocks cannot be in the future. The caller may retry once the
        // wall clock catches up.
        if block.slot > current_slot {
            return Err(BlockError::BlockIsFromFuture {
                block_slot: block.slot,
                current_slot,
            });
        }

        // Re-imports change nothing and produce no events.
        if self.store.contains_block(block_root) {
            return Ok(ImportOutcome::AlreadyKnown {
                head_root: self.store.best_block().root,
            });
        }

        let finalized_checkpoint = self.store.finalized_checkpoint();
        let finalized_slot = finalized_checkpoint
            .epoch
            .start_slot(E::slots_per_epoch());
        if block.slot <= finalized_slot {
            return Err(BlockError::InvalidBlock(InvalidBlock::SlotBeforeFinalized {
                block_slot: block.slot,
                finalized_slot,
            }));
        }

        let parent_root = block.parent_root;
        if !self.store.contains_block(parent_root) {
            return Err(BlockError::ParentUnknown { parent_root });
        }

        // The parent chain must lead back to the finalized block.
        let ancestor = self
            .store
            .ancestor_at_slot(parent_root, finalized_slot)
            .map_err(|e| BlockError::Internal(Error::Store(e)))?;
        if ancestor != finalized_checkpoint.root {
            return Err(BlockError::InvalidBlock(
                InvalidBlock::NotDescendantOfFinalized { block_root },
            ));
        }

        /*
         * State transition. Failures leave the store untouched.
         */

        let mut state = self.pre_state(parent_root, pre_state_hint)?;
        process_slots(&mut state, block.slot)
            .map_err(|e| BlockError::FailedStateTransition(TransitionCause::Slot(e)))?;
        per_block_processing(&mut state, signed_block)
            .map_err(|e| BlockError::FailedStateTransition(TransitionCause::Block(e)))?;

        /*
         * Stage the block, fold in its consequences, commit once.
         */

        let mut tx = self.store.transaction();
        tx.put_block(block_root, signed_block.clone(), state.clone(), true);

        self.stage_checkpoint_updates(&mut tx, &state)
            .map_err(BlockError::Internal)?;

        // Votes carried by the block apply after staging, before commit.
        for attestation in &block.body.attestations {
            self.stage_attestation_votes(&mut tx, attestation);
        }

        // Fast path: a block extending the current head becomes the head
        // without a tree walk, provided fork choice has not moved past its
        // slot.
        let old_best = tx.best_block();
        let mut new_head = old_best.root;
        let mut reorg = None;
        if parent_root == old_best.root && tx.time() <= block.slot {
            tx.set_best_block(block_root, block.slot);
            new_head = block_root;

            let in_effect = tx
                .ancestor_at_slot(block_root, old_best.slot)
                .map_err(|e| BlockError::Internal(Error::Store(e)))?;
            if in_effect != old_best.root {
                reorg = Some(ReorgEvent {
                    best_block_root: block_root,
                    best_slot: block.slot,
                });
            }
        }

        let finalization_advanced = tx.finalized_checkpoint().epoch > finalized_checkpoint.epoch;
        let new_finalized = tx.finalized_checkpoint();

        tx.commit().map_err(|e| BlockError::Internal(e.into()))?;

        debug!(
            self.log, "Block imported";
            "root" => ?block_root,
            "slot" => %block.slot,
            "head" => ?new_head,
        );

        if new_head == block_root {
            metrics::inc_counter(&metrics::HEAD_UPDATES_TOTAL);
            self.events.register(EventKind::Head(HeadEvent {
                root: new_head,
                slot: block.slot,
            }));
        }
        if let Some(reorg) = reorg {
            metrics::inc_counter(&metrics::REORGS_TOTAL);
            self.events.register(EventKind::Reorg(reorg));
        }
        if finalization_advanced {
            self.events
                .register(EventKind::FinalizedCheckpoint(new_finalized));
        }

        Ok(ImportOutcome::Imported {
            head_root: new_head,
        })
    }

    /// Resolves the parent's post-state, preferring a hint that actually
    /// matches the parent.
    fn pre_state(
        &self,
        parent_root: Hash256,
        hint: Option<&BeaconState<E>>,
    ) -> Result<BeaconState<E>, BlockError> {
        if let Some(hint) = hint {
            let matches_parent = self
                .store
                .block(parent_root)
                .map(|parent| parent.message.state_root == hint.canonical_root())
                .unwrap_or(false);
            if matches_parent {
                return Ok(hint.clone());
            }
            trace!(
                self.log, "Pre-state hint did not match parent";
                "parent_root" => ?parent_root,
            );
        }

        self.store
            .block_state(parent_root)
            .ok_or_else(|| BlockError::Internal(self.fatal(Error::MissingState(parent_root))))
    }

    /// Applies the post-state's justification/finalization knowledge to the
    /// transaction, following the bouncing-attack rules.
    fn stage_checkpoint_updates(
        &self,
        tx: &mut Transaction<E>,
        state: &BeaconState<E>,
    ) -> Result<(), Error> {
        if state.current_justified_checkpoint.epoch > tx.justified_checkpoint().epoch {
            if state.current_justified_checkpoint.epoch > tx.best_justified_checkpoint().epoch {
                tx.set_best_justified_checkpoint(state.current_justified_checkpoint);
            }
            if self.should_update_justified_checkpoint(tx, state.current_justified_checkpoint)? {
                tx.set_justified_checkpoint(state.current_justified_checkpoint);
            }
        }

        if state.finalized_checkpoint.epoch > tx.finalized_checkpoint().epoch {
            let new_finalized = state.finalized_checkpoint;
            let finalized_block = tx
                .block(new_finalized.root)
                .ok_or_else(|| self.fatal(Error::MissingBlock(new_finalized.root)))?;
            let finalized_state = tx
                .block_state(new_finalized.root)
                .ok_or_else(|| self.fatal(Error::MissingState(new_finalized.root)))?;
            tx.set_finalized_data(new_finalized, finalized_block, finalized_state);

            let finalized_slot = new_finalized.epoch.start_slot(E::slots_per_epoch());
            let justified_ancestor =
                tx.ancestor_at_slot(tx.justified_checkpoint().root, finalized_slot)?;
            if state.current_justified_checkpoint.epoch > tx.justified_checkpoint().epoch
                || justified_ancestor != new_finalized.root
            {
                tx.set_justified_checkpoint(state.current_justified_checkpoint);
            }
        }

        Ok(())
    }

    /// To address the bouncing attack, only update conflicting justified
    /// checkpoints in the early slots of the epoch; otherwise wait for the
    /// epoch boundary.
    fn should_update_justified_checkpoint(
        &self,
        tx: &Transaction<E>,
        new_justified: Checkpoint,
    ) -> Result<bool, Error> {
        if tx.time() % E::slots_per_epoch() < SAFE_SLOTS_TO_UPDATE_JUSTIFIED {
            return Ok(true);
        }

        let justified_slot = tx
            .justified_checkpoint()
            .epoch
            .start_slot(E::slots_per_epoch());
        Ok(tx.ancestor_at_slot(new_justified.root, justified_slot)?
            == tx.justified_checkpoint().root)
    }

    /// Folds one block-carried attestation into the transaction's vote
    /// overlay. Unknown head blocks are skipped: the containing block has
    /// already passed the transition, so a stray vote is not an error.
    fn stage_attestation_votes(&self, tx: &mut Transaction<E>, attestation: &IndexedAttestation) {
        let data = &attestation.data;
        if data.beacon_block_root == Hash256::zero() {
            return;
        }
        if !tx.contains_block(data.beacon_block_root) {
            trace!(
                self.log, "Block attestation names unknown block";
                "block_root" => ?data.beacon_block_root,
            );
            return;
        }
        if data.slot >= tx.time() {
            self.queued_attestations
                .lock()
                .push(QueuedAttestation::from(attestation));
            return;
        }
        for validator in attestation.attesting_indices.iter().copied() {
            tx.put_vote(validator, Vote::new(data.beacon_block_root, data.target.epoch));
        }
    }

    /// Registers a standalone attestation so it may influence future head
    /// selection.
    pub fn on_attestation(&self, attestation: &IndexedAttestation) -> Result<(), Error> {
        self.check_active()?;
        self.update_time(self.current_wall_slot())?;

        // Attestations to the zero hash (validators that have never seen a
        // block) carry no usable vote.
        if attestation.data.beacon_block_root == Hash256::zero() {
            return Ok(());
        }

        self.validate_on_attestation(attestation)?;

        if attestation.data.slot < self.store.time() {
            let mut tx = self.store.transaction();
            for validator in attestation.attesting_indices.iter().copied() {
                tx.put_vote(
                    validator,
                    Vote::new(
                        attestation.data.beacon_block_root,
                        attestation.data.target.epoch,
                    ),
                );
            }
            tx.commit()?;
        } else {
            // Attestations can only affect the fork choice of subsequent
            // slots; park until the slot passes.
            self.queued_attestations
                .lock()
                .push(QueuedAttestation::from(attestation));
        }

        Ok(())
    }

    fn validate_on_attestation(
        &self,
        attestation: &IndexedAttestation,
    ) -> Result<(), InvalidAttestation> {
        if attestation.attesting_indices.is_empty() {
            return Err(InvalidAttestation::EmptyAttestingIndices);
        }

        let slot_now = self.store.time();
        let epoch_now = slot_now.epoch(E::slots_per_epoch());
        let target = attestation.data.target;

        // Attestations must be from the current or previous epoch.
        if target.epoch > epoch_now {
            return Err(InvalidAttestation::FutureEpoch {
                attestation_epoch: target.epoch,
                current_epoch: epoch_now,
            });
        } else if target.epoch + 1 < epoch_now {
            return Err(InvalidAttestation::PastEpoch {
                attestation_epoch: target.epoch,
                current_epoch: epoch_now,
            });
        }

        if target.epoch != attestation.data.slot.epoch(E::slots_per_epoch()) {
            return Err(InvalidAttestation::BadTargetEpoch);
        }

        let block_slot = self
            .store
            .block_slot(attestation.data.beacon_block_root)
            .ok_or(InvalidAttestation::UnknownHeadBlock {
                beacon_block_root: attestation.data.beacon_block_root,
            })?;

        // Attestations must not be for blocks in the future.
        if block_slot > attestation.data.slot {
            return Err(InvalidAttestation::AttestsToFutureBlock {
                block: block_slot,
                attestation: attestation.data.slot,
            });
        }

        Ok(())
    }

    /// Runs LMD-GHOST and declares the winner the best block as of
    /// `node_slot`. Returns the head root.
    pub fn process_head(&self, node_slot: Slot) -> Result<Hash256, Error> {
        self.check_active()?;
        self.update_time(node_slot)?;
        let _timer = metrics::start_timer(&metrics::HEAD_SELECTION_SECONDS);

        let view = self.store.head_selection_view()?;
        let head = Self::find_head(&view)?;

        let best_slot = view.time.max(
            view.tree
                .slot_of(head)
                .ok_or(Error::MissingBlock(head))?,
        );
        let old_best = view.best_block;

        let mut tx = self.store.transaction();
        tx.set_best_block(head, best_slot);
        tx.commit()?;

        if head != old_best.root {
            metrics::inc_counter(&metrics::HEAD_UPDATES_TOTAL);
            self.events.register(EventKind::Head(HeadEvent {
                root: head,
                slot: best_slot,
            }));

            let in_effect = view
                .tree
                .ancestor_at_slot(head, old_best.slot)
                .map_err(StoreError::from)?;
            if in_effect != old_best.root {
                metrics::inc_counter(&metrics::REORGS_TOTAL);
                let reorg = ReorgEvent {
                    best_block_root: head,
                    best_slot,
                };
                debug!(
                    self.log, "Chain reorganization";
                    "best_block_root" => ?reorg.best_block_root,
                    "best_slot" => %reorg.best_slot,
                );
                self.events.register(EventKind::Reorg(reorg));
            }
        }

        Ok(head)
    }

    /// The LMD-GHOST walk: from the justified block, repeatedly descend into
    /// the child with the greatest attesting balance, breaking ties by the
    /// greater root. Stable across nodes because the ordering is total.
    fn find_head(view: &HeadSelectionView) -> Result<Hash256, Error> {
        let justified_root = view.justified_checkpoint.root;
        if !view.tree.contains(justified_root) {
            return Err(Error::MissingBlock(justified_root));
        }

        let mut head = justified_root;
        loop {
            let best_child = view
                .tree
                .children(head)
                .iter()
                .map(|child| (Self::attesting_balance(view, *child), *child))
                .max();

            match best_child {
                Some((_, child)) => head = child,
                None => return Ok(head),
            }
        }
    }

    /// Sum of the effective balances behind votes targeting `root` or any of
    /// its descendants.
    fn attesting_balance(view: &HeadSelectionView, root: Hash256) -> Gwei {
        view.votes
            .iter()
            .filter(|(_, vote)| view.tree.is_descendant(root, vote.root))
            .map(|(validator, _)| {
                view.justified_balances
                    .get(*validator as usize)
                    .copied()
                    .unwrap_or(0)
            })
            .sum()
    }
}
