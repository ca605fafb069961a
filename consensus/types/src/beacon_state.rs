use crate::fork::compute_fork_digest;
use crate::hashing::{container_tree_hash_root, list_tree_hash_root};
use crate::{
    BeaconBlockHeader, ChainSpec, Checkpoint, Epoch, EthSpec, Fork, ForkDigest, Gwei, Hash256,
    PendingAttestation, Slot, Validator, ValidatorIndex,
};
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;
use tree_hash::TreeHash;

/// The number of FFG justification bits tracked by the state.
pub const JUSTIFICATION_BITS_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum BeaconStateError {
    /// The requested slot is not covered by the block/state root ring
    /// buffers.
    SlotOutOfBounds { slot: Slot, current_slot: Slot },
    UnknownValidator(usize),
    JustificationBitOutOfBounds(usize),
}

/// The full beacon state at a given slot, trimmed to the registries and
/// checkpoints the chain coordination core consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "E: EthSpec")]
pub struct BeaconState<E: EthSpec> {
    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    pub slot: Slot,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: Vec<Hash256>,
    pub state_roots: Vec<Hash256>,

    // Registry
    pub validators: Vec<Validator>,
    pub balances: Vec<Gwei>,

    // Attestations awaiting epoch processing
    pub previous_epoch_attestations: Vec<PendingAttestation>,
    pub current_epoch_attestations: Vec<PendingAttestation>,

    // Finality
    pub justification_bits: u8,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    #[serde(skip)]
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> BeaconState<E> {
    /// Creates a state at the genesis slot with empty registries and zeroed
    /// history.
    pub fn new(genesis_time: u64, spec: &ChainSpec) -> Self {
        Self {
            genesis_time,
            genesis_validators_root: Hash256::zero(),
            slot: Slot::new(0),
            fork: Fork {
                previous_version: spec.genesis_fork_version,
                current_version: spec.genesis_fork_version,
                epoch: Epoch::new(0),
            },
            latest_block_header: BeaconBlockHeader::default(),
            block_roots: vec![Hash256::zero(); E::slots_per_historical_root()],
            state_roots: vec![Hash256::zero(); E::slots_per_historical_root()],
            validators: vec![],
            balances: vec![],
            previous_epoch_attestations: vec![],
            current_epoch_attestations: vec![],
            justification_bits: 0,
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),
            _phantom: PhantomData,
        }
    }

    /// The epoch corresponding to `self.slot`.
    pub fn current_epoch(&self) -> Epoch {
        self.slot.epoch(E::slots_per_epoch())
    }

    /// The epoch prior to `self.current_epoch()`, clamped to genesis.
    pub fn previous_epoch(&self) -> Epoch {
        let current_epoch = self.current_epoch();
        if current_epoch > E::genesis_epoch() {
            current_epoch - 1
        } else {
            current_epoch
        }
    }

    /// The fork digest in force for this state.
    pub fn fork_digest(&self) -> ForkDigest {
        compute_fork_digest(self.fork.current_version, self.genesis_validators_root)
    }

    /// Returns the block root in effect at `slot`, so long as the ring buffer
    /// still covers it.
    pub fn get_block_root_at_slot(&self, slot: Slot) -> Result<Hash256, BeaconStateError> {
        self.check_slot_in_range(slot)?;
        Ok(self.block_roots[slot.as_usize() % E::slots_per_historical_root()])
    }

    pub fn set_block_root_at_slot(
        &mut self,
        slot: Slot,
        root: Hash256,
    ) -> Result<(), BeaconStateError> {
        self.check_slot_in_range(slot)?;
        self.block_roots[slot.as_usize() % E::slots_per_historical_root()] = root;
        Ok(())
    }

    pub fn set_state_root_at_slot(
        &mut self,
        slot: Slot,
        root: Hash256,
    ) -> Result<(), BeaconStateError> {
        self.check_slot_in_range(slot)?;
        self.state_roots[slot.as_usize() % E::slots_per_historical_root()] = root;
        Ok(())
    }

    fn check_slot_in_range(&self, slot: Slot) -> Result<(), BeaconStateError> {
        if slot < self.slot
            && self.slot <= slot.saturating_add(E::slots_per_historical_root() as u64)
        {
            Ok(())
        } else {
            Err(BeaconStateError::SlotOutOfBounds {
                slot,
                current_slot: self.slot,
            })
        }
    }

    /// Indices of validators eligible to vote at `epoch`.
    pub fn get_active_validator_indices(&self, epoch: Epoch) -> Vec<ValidatorIndex> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, validator)| validator.is_active_at(epoch))
            .map(|(index, _)| index as ValidatorIndex)
            .collect()
    }

    pub fn get_effective_balance(&self, index: ValidatorIndex) -> Result<Gwei, BeaconStateError> {
        self.validators
            .get(index as usize)
            .map(|validator| validator.effective_balance)
            .ok_or(BeaconStateError::UnknownValidator(index as usize))
    }

    /// Sum of the effective balances of all active validators. Never zero, so
    /// callers may divide by it.
    pub fn get_total_active_balance(&self) -> Gwei {
        let epoch = self.current_epoch();
        let total: Gwei = self
            .validators
            .iter()
            .filter(|validator| validator.is_active_at(epoch))
            .map(|validator| validator.effective_balance)
            .sum();
        total.max(1)
    }

    /// Shift the justification bits along one epoch, dropping the oldest.
    pub fn rotate_justification_bits(&mut self) {
        self.justification_bits =
            (self.justification_bits << 1) & ((1 << JUSTIFICATION_BITS_LENGTH as u8) - 1);
    }

    pub fn set_justification_bit(&mut self, i: usize) -> Result<(), BeaconStateError> {
        if i >= JUSTIFICATION_BITS_LENGTH {
            return Err(BeaconStateError::JustificationBitOutOfBounds(i));
        }
        self.justification_bits |= 1 << i as u8;
        Ok(())
    }

    pub fn justification_bit(&self, i: usize) -> Result<bool, BeaconStateError> {
        if i >= JUSTIFICATION_BITS_LENGTH {
            return Err(BeaconStateError::JustificationBitOutOfBounds(i));
        }
        Ok(self.justification_bits & (1 << i as u8) != 0)
    }

    /// Returns `true` if all bits in `range` are set.
    pub fn justification_bits_set(&self, range: std::ops::Range<usize>) -> bool {
        range.clone().all(|i| self.justification_bit(i).unwrap_or(false))
    }

    /// Returns the tree hash of the state.
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.tree_hash_root()[..])
    }
}

impl<E: EthSpec> tree_hash::TreeHash for BeaconState<E> {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Container
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("Container should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("Container should never be packed.")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        container_tree_hash_root(&[
            &self.genesis_time.tree_hash_root(),
            &self.genesis_validators_root.tree_hash_root(),
            &self.slot.tree_hash_root(),
            &self.fork.tree_hash_root(),
            &self.latest_block_header.tree_hash_root(),
            &list_tree_hash_root(&self.block_roots),
            &list_tree_hash_root(&self.state_roots),
            &list_tree_hash_root(&self.validators),
            &list_tree_hash_root(&self.balances),
            &list_tree_hash_root(&self.previous_epoch_attestations),
            &list_tree_hash_root(&self.current_epoch_attestations),
            &self.justification_bits.tree_hash_root(),
            &self.previous_justified_checkpoint.tree_hash_root(),
            &self.current_justified_checkpoint.tree_hash_root(),
            &self.finalized_checkpoint.tree_hash_root(),
        ])
    }
}
