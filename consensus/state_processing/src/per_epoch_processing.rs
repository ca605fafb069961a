use crate::errors::SlotProcessingError;
use itertools::Itertools;
use types::{
    BeaconState, Checkpoint, Epoch, EthSpec, Gwei, PendingAttestation, GENESIS_EPOCH,
};

/// Updates the justification bits and checkpoints from the attestations
/// accumulated over the closing epoch, then applies the finalization rules.
///
/// Called on the last slot of each epoch, before `state.slot` advances into
/// the next one.
pub fn process_justification_and_finalization<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), SlotProcessingError> {
    if state.current_epoch() > GENESIS_EPOCH + 1 {
        // Finalization is judged against the checkpoints as they stood
        // before this epoch's justification updates.
        let old_previous_justified = state.previous_justified_checkpoint;
        let old_current_justified = state.current_justified_checkpoint;

        justify(state)?;
        finalize(state, old_previous_justified, old_current_justified);
    }

    // Participation records rotate regardless of justification progress.
    state.previous_epoch_attestations =
        std::mem::replace(&mut state.current_epoch_attestations, vec![]);

    Ok(())
}

fn justify<E: EthSpec>(state: &mut BeaconState<E>) -> Result<(), SlotProcessingError> {
    let previous_epoch = state.previous_epoch();
    let current_epoch = state.current_epoch();

    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.rotate_justification_bits();

    let total_active_balance = state.get_total_active_balance();

    let previous_target_balance = attesting_target_balance(state, previous_epoch)?;
    if previous_target_balance * 3 >= total_active_balance * 2 {
        state.current_justified_checkpoint = Checkpoint {
            epoch: previous_epoch,
            root: state.get_block_root_at_slot(previous_epoch.start_slot(E::slots_per_epoch()))?,
        };
        state.set_justification_bit(1)?;
    }

    let current_target_balance = attesting_target_balance(state, current_epoch)?;
    if current_target_balance * 3 >= total_active_balance * 2 {
        state.current_justified_checkpoint = Checkpoint {
            epoch: current_epoch,
            root: state.get_block_root_at_slot(current_epoch.start_slot(E::slots_per_epoch()))?,
        };
        state.set_justification_bit(0)?;
    }

    Ok(())
}

fn finalize<E: EthSpec>(
    state: &mut BeaconState<E>,
    old_previous_justified: Checkpoint,
    old_current_justified: Checkpoint,
) {
    let current_epoch = state.current_epoch();

    // The 2nd/3rd/4th most recent epochs are justified, the 2nd using the
    // 4th as source.
    if state.justification_bits_set(1..4) && old_previous_justified.epoch + 3 == current_epoch {
        state.finalized_checkpoint = old_previous_justified;
    }
    // The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as
    // source.
    if state.justification_bits_set(1..3) && old_previous_justified.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_previous_justified;
    }
    // The 1st/2nd/3rd most recent epochs are justified, the 1st using the
    // 3rd as source.
    if state.justification_bits_set(0..3) && old_current_justified.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_current_justified;
    }
    // The 1st/2nd most recent epochs are justified, the 1st using the 2nd as
    // source.
    if state.justification_bits_set(0..2) && old_current_justified.epoch + 1 == current_epoch {
        state.finalized_checkpoint = old_current_justified;
    }
}

/// Sum of the effective balances of distinct validators whose attestations
/// voted for the correct target checkpoint of `epoch`.
fn attesting_target_balance<E: EthSpec>(
    state: &BeaconState<E>,
    epoch: Epoch,
) -> Result<Gwei, SlotProcessingError> {
    let target_root =
        state.get_block_root_at_slot(epoch.start_slot(E::slots_per_epoch()))?;

    let attestations: &[PendingAttestation] = if epoch == state.current_epoch() {
        &state.current_epoch_attestations
    } else {
        &state.previous_epoch_attestations
    };

    let balance = attestations
        .iter()
        .filter(|attestation| {
            attestation.data.target.epoch == epoch && attestation.data.target.root == target_root
        })
        .flat_map(|attestation| attestation.attesting_indices.iter().copied())
        .unique()
        .filter_map(|index| state.validators.get(index as usize))
        .filter(|validator| !validator.slashed && validator.is_active_at(epoch))
        .map(|validator| validator.effective_balance)
        .sum();

    Ok(balance)
}
