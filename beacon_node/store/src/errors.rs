use types::{BeaconStateError, Hash256, Slot};

#[derive(Debug, PartialEq, Clone)]
pub enum StoreError {
    /// A staged block's parent is neither hot nor the finalized block.
    UnknownParent {
        block_root: Hash256,
        parent_root: Hash256,
    },
    /// The requested block is not in the hot tree.
    UnknownBlock(Hash256),
    /// A hot block is missing its cached post-state. This is a corruption
    /// indicator, not a recoverable condition.
    MissingState(Hash256),
    /// The requested slot is older than the root history retained alongside
    /// the finalized state. A caller that knows the block must exist treats
    /// this as corruption.
    HistoricalBlockUnavailable(Slot),
    /// A commit attempted to move finality backwards.
    FinalizedCheckpointReverted {
        current_epoch: types::Epoch,
        new_epoch: types::Epoch,
    },
    BeaconStateError(BeaconStateError),
}

impl From<BeaconStateError> for StoreError {
    fn from(e: BeaconStateError) -> Self {
        StoreError::BeaconStateError(e)
    }
}
