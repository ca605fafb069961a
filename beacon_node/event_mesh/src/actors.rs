//! The actors of the duty pipeline.
//!
//! Each actor is a plain state machine: it consumes events in arrival order,
//! keeps per-slot state, and emits derived events once every input it needs
//! for the current slot has arrived. `SlotTerminal` (or the next `NewSlot`)
//! discards the per-slot state.

use crate::events::MeshEvent;
use std::collections::HashMap;
use std::marker::PhantomData;
use types::{
    AttestationData, BeaconBlock, BeaconBlockBody, Checkpoint, EthSpec, Hash256,
    IndexedAttestation, SignatureBytes, SignedBeaconBlock, Slot, ValidatorIndex,
};

/// One actor of the mesh: consumes an event, returns derived events.
pub trait Actor: Send + 'static {
    fn name(&self) -> &'static str;

    fn handle(&mut self, event: MeshEvent) -> Vec<MeshEvent>;
}

/// Produces attestations for the validators this node controls, once the
/// head, the shard heads and the not-yet-crosslinked blocks for the current
/// slot are all known.
pub struct BeaconAttester<E: EthSpec> {
    validators: Vec<ValidatorIndex>,
    current_slot: Option<Slot>,
    head: Option<Hash256>,
    shard_heads: Option<Vec<Hash256>>,
    not_crosslinked: Option<Vec<Hash256>>,
    published: bool,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> BeaconAttester<E> {
    pub fn new(validators: Vec<ValidatorIndex>) -> Self {
        Self {
            validators,
            current_slot: None,
            head: None,
            shard_heads: None,
            not_crosslinked: None,
            published: false,
            _phantom: PhantomData,
        }
    }

    fn reset(&mut self) {
        self.current_slot = None;
        self.head = None;
        self.shard_heads = None;
        self.not_crosslinked = None;
        self.published = false;
    }

    fn ready(&self) -> Option<(Slot, Hash256)> {
        if self.published || self.shard_heads.is_none() || self.not_crosslinked.is_none() {
            return None;
        }
        Some((self.current_slot?, self.head?))
    }
}

impl<E: EthSpec> Actor for BeaconAttester<E> {
    fn name(&self) -> &'static str {
        "beacon_attester"
    }

    fn handle(&mut self, event: MeshEvent) -> Vec<MeshEvent> {
        match event {
            MeshEvent::NewSlot(slot) => {
                self.reset();
                self.current_slot = Some(slot);
            }
            MeshEvent::SlotTerminal(slot) => {
                if self.current_slot == Some(slot) {
                    self.reset();
                }
            }
            MeshEvent::HeadAfterNewBeaconBlock { slot, head_root }
                if self.current_slot == Some(slot) =>
            {
                self.head = Some(head_root);
            }
            MeshEvent::NewShardHeads { slot, shard_heads }
                if self.current_slot == Some(slot) =>
            {
                self.shard_heads = Some(shard_heads);
            }
            MeshEvent::NotCrosslinkedBlocksPublished { slot, block_roots }
                if self.current_slot == Some(slot) =>
            {
                self.not_crosslinked = Some(block_roots);
            }
            _ => {}
        }

        if let Some((slot, head)) = self.ready() {
            self.published = true;
            let attestations = self
                .validators
                .iter()
                .map(|validator| IndexedAttestation {
                    attesting_indices: vec![*validator],
                    data: AttestationData {
                        slot,
                        beacon_block_root: head,
                        source: Checkpoint::default(),
                        target: Checkpoint {
                            epoch: slot.epoch(E::slots_per_epoch()),
                            root: head,
                        },
                    },
                })
                .collect();
            vec![MeshEvent::NewAttestations { slot, attestations }]
        } else {
            vec![]
        }
    }
}

/// Holds attestations for a slot until the chain has moved on, then
/// republishes them for inclusion and closes the slot.
pub struct DelayedAttestationsProcessor {
    buffered: HashMap<Slot, Vec<IndexedAttestation>>,
}

impl DelayedAttestationsProcessor {
    pub fn new() -> Self {
        Self {
            buffered: HashMap::new(),
        }
    }
}

impl Default for DelayedAttestationsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for DelayedAttestationsProcessor {
    fn name(&self) -> &'static str {
        "delayed_attestations_processor"
    }

    fn handle(&mut self, event: MeshEvent) -> Vec<MeshEvent> {
        match event {
            MeshEvent::NewAttestations { slot, attestations } => {
                self.buffered.entry(slot).or_default().extend(attestations);
                vec![]
            }
            MeshEvent::NewSlot(slot) if slot > Slot::new(0) => {
                let mut released: Vec<IndexedAttestation> = vec![];
                let mut stale_slots: Vec<Slot> = self
                    .buffered
                    .keys()
                    .filter(|buffered_slot| **buffered_slot < slot)
                    .copied()
                    .collect();
                stale_slots.sort();
                for stale in stale_slots {
                    if let Some(attestations) = self.buffered.remove(&stale) {
                        released.extend(attestations);
                    }
                }

                vec![
                    MeshEvent::PrevSlotAttestationsPublished {
                        slot,
                        attestations: released,
                    },
                    MeshEvent::SlotTerminal(slot - 1),
                ]
            }
            _ => vec![],
        }
    }
}

/// Proposes a block once the previous slot's attestations are available,
/// using a round-robin stand-in for the proposer shuffling.
pub struct BlockProposer {
    validator: ValidatorIndex,
    validator_count: u64,
    current_slot: Option<Slot>,
    parent: Option<Hash256>,
    prev_attestations: Option<Vec<IndexedAttestation>>,
    published: bool,
}

impl BlockProposer {
    pub fn new(validator: ValidatorIndex, validator_count: u64) -> Self {
        Self {
            validator,
            validator_count,
            current_slot: None,
            parent: None,
            prev_attestations: None,
            published: false,
        }
    }

    fn reset(&mut self) {
        self.current_slot = None;
        self.parent = None;
        self.prev_attestations = None;
        self.published = false;
    }

    fn is_proposer(&self, slot: Slot) -> bool {
        slot % self.validator_count == self.validator
    }

    fn ready(&self) -> Option<(Slot, Hash256)> {
        if self.published || self.prev_attestations.is_none() {
            return None;
        }
        Some((self.current_slot?, self.parent?))
    }
}

impl Actor for BlockProposer {
    fn name(&self) -> &'static str {
        "block_proposer"
    }

    fn handle(&mut self, event: MeshEvent) -> Vec<MeshEvent> {
        match event {
            MeshEvent::NewSlot(slot) => {
                self.reset();
                self.current_slot = Some(slot);
            }
            MeshEvent::SlotTerminal(slot) => {
                if self.current_slot == Some(slot) {
                    self.reset();
                }
            }
            MeshEvent::HeadAfterNewBeaconBlock { slot, head_root }
                if self.current_slot == Some(slot) =>
            {
                self.parent = Some(head_root);
            }
            MeshEvent::PrevSlotAttestationsPublished { slot, attestations }
                if self.current_slot == Some(slot) =>
            {
                self.prev_attestations = Some(attestations);
            }
            _ => {}
        }

        if let Some((slot, parent)) = self.ready() {
            self.published = true;
            if self.is_proposer(slot) {
                let block = BeaconBlock {
                    slot,
                    proposer_index: self.validator,
                    parent_root: parent,
                    state_root: Hash256::zero(),
                    body: BeaconBlockBody {
                        attestations: self.prev_attestations.clone().unwrap_or_default(),
                    },
                };
                return vec![MeshEvent::NewBeaconBlock {
                    slot,
                    block: Box::new(SignedBeaconBlock {
                        message: block,
                        signature: SignatureBytes::empty(),
                    }),
                }];
            }
        }
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    type E = MinimalEthSpec;

    fn slot_inputs(slot: u64, head: Hash256) -> Vec<MeshEvent> {
        vec![
            MeshEvent::NewSlot(Slot::new(slot)),
            MeshEvent::HeadAfterNewBeaconBlock {
                slot: Slot::new(slot),
                head_root: head,
            },
            MeshEvent::NewShardHeads {
                slot: Slot::new(slot),
                shard_heads: vec![],
            },
            MeshEvent::NotCrosslinkedBlocksPublished {
                slot: Slot::new(slot),
                block_roots: vec![],
            },
        ]
    }

    #[test]
    fn attester_waits_for_all_inputs() {
        let mut attester = BeaconAttester::<E>::new(vec![0, 1]);
        let head = Hash256::repeat_byte(1);
        let mut inputs = slot_inputs(3, head);
        let last = inputs.pop().unwrap();

        for event in inputs {
            assert!(attester.handle(event).is_empty());
        }

        let derived = attester.handle(last);
        match &derived[..] {
            [MeshEvent::NewAttestations { slot, attestations }] => {
                assert_eq!(*slot, Slot::new(3));
                assert_eq!(attestations.len(), 2);
                assert_eq!(attestations[0].data.beacon_block_root, head);
            }
            other => panic!("unexpected derived events: {:?}", other),
        }
    }

    #[test]
    fn attester_publishes_once_per_slot() {
        let mut attester = BeaconAttester::<E>::new(vec![0]);
        let head = Hash256::repeat_byte(1);

        for event in slot_inputs(3, head) {
            attester.handle(event);
        }

        // Re-delivering an input does not re-publish.
        let derived = attester.handle(MeshEvent::NewShardHeads {
            slot: Slot::new(3),
            shard_heads: vec![],
        });
        assert!(derived.is_empty());
    }

    #[test]
    fn attester_ignores_stale_slot_inputs() {
        let mut attester = BeaconAttester::<E>::new(vec![0]);
        attester.handle(MeshEvent::NewSlot(Slot::new(4)));

        // Inputs for slot 3 arrive late; the actor must not mix slots.
        let derived = attester.handle(MeshEvent::HeadAfterNewBeaconBlock {
            slot: Slot::new(3),
            head_root: Hash256::repeat_byte(1),
        });
        assert!(derived.is_empty());
    }

    #[test]
    fn slot_terminal_resets_state() {
        let mut attester = BeaconAttester::<E>::new(vec![0]);
        let mut inputs = slot_inputs(3, Hash256::repeat_byte(1));
        let last = inputs.pop().unwrap();
        for event in inputs {
            attester.handle(event);
        }

        attester.handle(MeshEvent::SlotTerminal(Slot::new(3)));

        // The last input alone is no longer sufficient.
        assert!(attester.handle(last).is_empty());
    }

    #[test]
    fn delayed_processor_republishes_previous_slot() {
        let mut processor = DelayedAttestationsProcessor::new();
        let attestation = IndexedAttestation {
            attesting_indices: vec![0],
            data: AttestationData::default(),
        };

        processor.handle(MeshEvent::NewAttestations {
            slot: Slot::new(3),
            attestations: vec![attestation.clone()],
        });

        let derived = processor.handle(MeshEvent::NewSlot(Slot::new(4)));
        assert_eq!(
            derived,
            vec![
                MeshEvent::PrevSlotAttestationsPublished {
                    slot: Slot::new(4),
                    attestations: vec![attestation],
                },
                MeshEvent::SlotTerminal(Slot::new(3)),
            ]
        );

        // Nothing left for the next boundary.
        let derived = processor.handle(MeshEvent::NewSlot(Slot::new(5)));
        assert_eq!(
            derived[0],
            MeshEvent::PrevSlotAttestationsPublished {
                slot: Slot::new(5),
                attestations: vec![],
            }
        );
    }

    #[test]
    fn proposer_round_robin() {
        let mut proposer = BlockProposer::new(1, 4);
        let head = Hash256::repeat_byte(2);

        // Slot 5 % 4 == 1: our turn.
        proposer.handle(MeshEvent::NewSlot(Slot::new(5)));
        proposer.handle(MeshEvent::HeadAfterNewBeaconBlock {
            slot: Slot::new(5),
            head_root: head,
        });
        let derived = proposer.handle(MeshEvent::PrevSlotAttestationsPublished {
            slot: Slot::new(5),
            attestations: vec![],
        });
        match &derived[..] {
            [MeshEvent::NewBeaconBlock { slot, block }] => {
                assert_eq!(*slot, Slot::new(5));
                assert_eq!(block.message.parent_root, head);
                assert_eq!(block.message.proposer_index, 1);
            }
            other => panic!("unexpected derived events: {:?}", other),
        }

        // Slot 6 % 4 == 2: not our turn.
        proposer.handle(MeshEvent::NewSlot(Slot::new(6)));
        proposer.handle(MeshEvent::HeadAfterNewBeaconBlock {
            slot: Slot::new(6),
            head_root: head,
        });
        let derived = proposer.handle(MeshEvent::PrevSlotAttestationsPublished {
            slot: Slot::new(6),
            attestations: vec![],
        });
        assert!(derived.is_empty());
    }
}
