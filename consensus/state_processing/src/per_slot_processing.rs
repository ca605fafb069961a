use crate::errors::SlotProcessingError;
use crate::per_epoch_processing::process_justification_and_finalization;
use types::{BeaconState, EthSpec, Hash256, Slot};

/// Advances `state` to `slot`, caching block and state roots for every slot
/// passed through and running epoch processing on epoch boundaries.
///
/// It is a no-op if `slot == state.slot`; a `slot` in the past is an error.
pub fn process_slots<E: EthSpec>(
    state: &mut BeaconState<E>,
    slot: Slot,
) -> Result<(), SlotProcessingError> {
    if slot < state.slot {
        return Err(SlotProcessingError::SlotNotLater {
            state_slot: state.slot,
            target_slot: slot,
        });
    }

    while state.slot < slot {
        process_slot(state);

        if (state.slot + 1) % E::slots_per_epoch() == 0 {
            process_justification_and_finalization(state)?;
        }

        state.slot += 1;
    }

    Ok(())
}

/// Caches the roots of the state and block occupying `state.slot`, filling
/// the state root the latest block header left zeroed.
fn process_slot<E: EthSpec>(state: &mut BeaconState<E>) {
    let index = state.slot.as_usize() % E::slots_per_historical_root();

    let previous_state_root = state.canonical_root();
    state.state_roots[index] = previous_state_root;

    if state.latest_block_header.state_root == Hash256::zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    state.block_roots[index] = state.latest_block_header.canonical_root();
}
