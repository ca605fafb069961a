use crate::errors::{AttestationInvalid, BlockProcessingError};
use types::{
    BeaconState, EthSpec, IndexedAttestation, PendingAttestation, SignedBeaconBlock,
};

/// Applies `block` to a state already advanced to the block's slot.
///
/// Signature verification is the caller's concern: blocks arrive here after
/// the BLS seam has vouched for them (or in contexts where signatures are
/// deliberately unchecked, such as locally produced blocks).
pub fn per_block_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
    signed_block: &SignedBeaconBlock,
) -> Result<(), BlockProcessingError> {
    let block = &signed_block.message;

    process_block_header(state, signed_block)?;

    for (index, attestation) in block.body.attestations.iter().enumerate() {
        process_attestation(state, attestation)
            .map_err(|reason| BlockProcessingError::AttestationInvalid { index, reason })?;
    }

    Ok(())
}

fn process_block_header<E: EthSpec>(
    state: &mut BeaconState<E>,
    signed_block: &SignedBeaconBlock,
) -> Result<(), BlockProcessingError> {
    let block = &signed_block.message;

    if block.slot != state.slot {
        return Err(BlockProcessingError::StateSlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        });
    }

    if block.slot <= state.latest_block_header.slot {
        return Err(BlockProcessingError::BlockNotNewer {
            header_slot: state.latest_block_header.slot,
            block_slot: block.slot,
        });
    }

    let expected_parent = state.latest_block_header.canonical_root();
    if block.parent_root != expected_parent {
        return Err(BlockProcessingError::ParentBlockRootMismatch {
            expected: expected_parent,
            found: block.parent_root,
        });
    }

    let proposer = state
        .validators
        .get(block.proposer_index as usize)
        .ok_or(BlockProcessingError::UnknownProposer(block.proposer_index))?;
    if proposer.slashed {
        return Err(BlockProcessingError::ProposerSlashed(block.proposer_index));
    }

    state.latest_block_header = block.temporary_block_header();

    Ok(())
}

fn process_attestation<E: EthSpec>(
    state: &mut BeaconState<E>,
    attestation: &IndexedAttestation,
) -> Result<(), AttestationInvalid> {
    let data = &attestation.data;
    let current_epoch = state.current_epoch();
    let previous_epoch = state.previous_epoch();

    if data.target.epoch != current_epoch && data.target.epoch != previous_epoch {
        return Err(AttestationInvalid::BadTargetEpoch {
            target: data.target.epoch,
            current: current_epoch,
        });
    }

    let slot_epoch = data.slot.epoch(E::slots_per_epoch());
    if data.target.epoch != slot_epoch {
        return Err(AttestationInvalid::TargetEpochSlotMismatch {
            target: data.target.epoch,
            slot_epoch,
        });
    }

    if state.slot <= data.slot {
        return Err(AttestationInvalid::IncludedTooEarly {
            state: state.slot,
            attestation: data.slot,
        });
    }

    if attestation.attesting_indices.is_empty() {
        return Err(AttestationInvalid::NoAttestingIndices);
    }

    if !attestation
        .attesting_indices
        .windows(2)
        .all(|pair| pair[0] < pair[1])
    {
        return Err(AttestationInvalid::BadAttestingIndicesOrdering);
    }

    if let Some(&unknown) = attestation
        .attesting_indices
        .iter()
        .find(|&&index| index as usize >= state.validators.len())
    {
        return Err(AttestationInvalid::UnknownValidator(unknown));
    }

    let pending = PendingAttestation {
        attesting_indices: attestation.attesting_indices.clone(),
        data: *data,
        inclusion_delay: state.slot.as_u64() - data.slot.as_u64(),
    };

    if data.target.epoch == current_epoch {
        state.current_epoch_attestations.push(pending);
    } else {
        state.previous_epoch_attestations.push(pending);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_slots;
    use types::test_utils::{empty_block, genesis};
    use types::{AttestationData, ChainSpec, Checkpoint, Epoch, Hash256, MinimalEthSpec, Slot};

    type E = MinimalEthSpec;

    fn setup() -> (types::SignedBeaconBlock, BeaconState<E>) {
        genesis::<E>(4, &ChainSpec::minimal())
    }

    #[test]
    fn applies_block_on_top_of_genesis() {
        let (genesis_block, mut state) = setup();
        process_slots(&mut state, Slot::new(1)).unwrap();

        let block = empty_block(Slot::new(1), genesis_block.canonical_root());
        per_block_processing(&mut state, &block).unwrap();

        assert_eq!(state.latest_block_header.slot, Slot::new(1));
        assert_eq!(
            state.latest_block_header.parent_root,
            genesis_block.canonical_root()
        );
    }

    #[test]
    fn rejects_wrong_slot() {
        let (genesis_block, mut state) = setup();
        process_slots(&mut state, Slot::new(1)).unwrap();

        let block = empty_block(Slot::new(2), genesis_block.canonical_root());
        assert_eq!(
            per_block_processing(&mut state, &block),
            Err(BlockProcessingError::StateSlotMismatch {
                state_slot: Slot::new(1),
                block_slot: Slot::new(2),
            })
        );
    }

    #[test]
    fn rejects_wrong_parent() {
        let (_, mut state) = setup();
        process_slots(&mut state, Slot::new(1)).unwrap();

        let block = empty_block(Slot::new(1), Hash256::repeat_byte(0xff));
        assert!(matches!(
            per_block_processing(&mut state, &block),
            Err(BlockProcessingError::ParentBlockRootMismatch { .. })
        ));
    }

    #[test]
    fn rejects_unknown_proposer() {
        let (genesis_block, mut state) = setup();
        process_slots(&mut state, Slot::new(1)).unwrap();

        let mut block = empty_block(Slot::new(1), genesis_block.canonical_root());
        block.message.proposer_index = 999;
        assert_eq!(
            per_block_processing(&mut state, &block),
            Err(BlockProcessingError::UnknownProposer(999))
        );
    }

    #[test]
    fn accumulates_attestations() {
        let (genesis_block, mut state) = setup();
        process_slots(&mut state, Slot::new(2)).unwrap();

        let mut block = empty_block(Slot::new(2), genesis_block.canonical_root());
        block.message.body.attestations.push(IndexedAttestation {
            attesting_indices: vec![0, 1],
            data: AttestationData {
                slot: Slot::new(1),
                beacon_block_root: genesis_block.canonical_root(),
                source: state.current_justified_checkpoint,
                target: Checkpoint {
                    epoch: Epoch::new(0),
                    root: genesis_block.canonical_root(),
                },
            },
        });

        // The parent check expects the chain to be unbroken; re-point the
        // block at the current header.
        block.message.parent_root = state.latest_block_header.canonical_root();

        per_block_processing(&mut state, &block).unwrap();
        assert_eq!(state.current_epoch_attestations.len(), 1);
        assert_eq!(state.current_epoch_attestations[0].inclusion_delay, 1);
    }

    #[test]
    fn rejects_unsorted_attesting_indices() {
        let (genesis_block, mut state) = setup();
        process_slots(&mut state, Slot::new(2)).unwrap();

        let mut block = empty_block(Slot::new(2), genesis_block.canonical_root());
        block.message.parent_root = state.latest_block_header.canonical_root();
        block.message.body.attestations.push(IndexedAttestation {
            attesting_indices: vec![1, 0],
            data: AttestationData {
                slot: Slot::new(1),
                beacon_block_root: genesis_block.canonical_root(),
                source: Checkpoint::default(),
                target: Checkpoint {
                    epoch: Epoch::new(0),
                    root: genesis_block.canonical_root(),
                },
            },
        });

        assert_eq!(
            per_block_processing(&mut state, &block),
            Err(BlockProcessingError::AttestationInvalid {
                index: 0,
                reason: AttestationInvalid::BadAttestingIndicesOrdering,
            })
        );
    }
}
