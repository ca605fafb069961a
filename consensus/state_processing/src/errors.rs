use types::{BeaconStateError, Epoch, Hash256, Slot, ValidatorIndex};

#[derive(Debug, PartialEq, Clone)]
pub enum SlotProcessingError {
    /// The target slot is earlier than the state's slot.
    SlotNotLater { state_slot: Slot, target_slot: Slot },
    BeaconStateError(BeaconStateError),
}

impl From<BeaconStateError> for SlotProcessingError {
    fn from(e: BeaconStateError) -> Self {
        SlotProcessingError::BeaconStateError(e)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum BlockProcessingError {
    /// The block is not for the state's current slot.
    StateSlotMismatch { state_slot: Slot, block_slot: Slot },
    /// The block is not newer than the latest block header.
    BlockNotNewer { header_slot: Slot, block_slot: Slot },
    /// The parent root does not match the latest block header.
    ParentBlockRootMismatch { expected: Hash256, found: Hash256 },
    UnknownProposer(ValidatorIndex),
    ProposerSlashed(ValidatorIndex),
    /// Attestation at `index` in the block body failed validation.
    AttestationInvalid {
        index: usize,
        reason: AttestationInvalid,
    },
    BeaconStateError(BeaconStateError),
}

impl From<BeaconStateError> for BlockProcessingError {
    fn from(e: BeaconStateError) -> Self {
        BlockProcessingError::BeaconStateError(e)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum AttestationInvalid {
    /// The target epoch is neither the current nor previous epoch.
    BadTargetEpoch { target: Epoch, current: Epoch },
    /// The target epoch does not match the epoch of the attestation slot.
    TargetEpochSlotMismatch { target: Epoch, slot_epoch: Epoch },
    /// The attestation was included in the same or an earlier slot than it
    /// attests to.
    IncludedTooEarly { state: Slot, attestation: Slot },
    NoAttestingIndices,
    /// Attesting indices are not sorted and unique.
    BadAttestingIndicesOrdering,
    UnknownValidator(ValidatorIndex),
}
