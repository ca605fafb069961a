//! End-to-end tests driving the fork choice engine over a real store.

use fork_choice::{
    BlockError, EventHandler, EventKind, ForkChoice, ImportOutcome, ReorgEvent,
};
use slog::Logger;
use sloggers::null::NullLoggerBuilder;
use sloggers::Build;
use slot_clock::{ManualSlotClock, SlotClock};
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use tokio::sync::broadcast::Receiver;
use types::test_utils::{empty_block, genesis};
use types::{
    AttestationData, ChainSpec, Checkpoint, Epoch, EthSpec, Hash256, IndexedAttestation,
    MinimalEthSpec, SignedBeaconBlock, Slot,
};

type E = MinimalEthSpec;

const VALIDATOR_COUNT: usize = 16;

fn null_logger() -> Logger {
    NullLoggerBuilder.build().expect("builds a null logger")
}

struct Harness {
    engine: ForkChoice<E, ManualSlotClock>,
    clock: ManualSlotClock,
    genesis_block: SignedBeaconBlock,
    reorg_rx: Receiver<EventKind>,
}

impl Harness {
    fn new() -> Self {
        let spec = ChainSpec::minimal();
        let (genesis_block, genesis_state) = genesis::<E>(VALIDATOR_COUNT, &spec);
        let (store, _storage_rx) =
            Store::from_anchor(genesis_block.clone(), genesis_state, null_logger());

        let clock = ManualSlotClock::new(
            Slot::new(0),
            Duration::from_secs(0),
            spec.slot_duration(),
        );
        let events = Arc::new(EventHandler::new(null_logger()));
        let reorg_rx = events.subscribe_reorg();

        let engine = ForkChoice::new(Arc::new(store), clock.clone(), events, null_logger());

        Self {
            engine,
            clock,
            genesis_block,
            reorg_rx,
        }
    }

    fn genesis_root(&self) -> Hash256 {
        self.genesis_block.canonical_root()
    }

    /// Imports an empty block at `slot` on `parent`, with the clock at the
    /// block's slot.
    fn extend(&mut self, slot: u64, parent: Hash256) -> Hash256 {
        self.import(empty_block(Slot::new(slot), parent))
    }

    fn import(&mut self, block: SignedBeaconBlock) -> Hash256 {
        self.clock.set_slot(block.slot());
        let outcome = self.engine.on_block(&block, None).expect("import succeeds");
        assert_eq!(
            outcome,
            ImportOutcome::Imported {
                head_root: outcome.head_root()
            }
        );
        block.canonical_root()
    }

    fn attest(&self, indices: Vec<u64>, head: Hash256, slot: u64) {
        let slot = Slot::new(slot);
        let attestation = IndexedAttestation {
            attesting_indices: indices,
            data: AttestationData {
                slot,
                beacon_block_root: head,
                source: Checkpoint::default(),
                target: Checkpoint {
                    epoch: slot.epoch(E::slots_per_epoch()),
                    root: head,
                },
            },
        };
        self.engine
            .on_attestation(&attestation)
            .expect("attestation accepted");
    }

    fn reorgs(&mut self) -> Vec<ReorgEvent> {
        let mut reorgs = vec![];
        while let Ok(event) = self.reorg_rx.try_recv() {
            match event {
                EventKind::Reorg(reorg) => reorgs.push(reorg),
                _ => unreachable!("reorg channel only carries reorgs"),
            }
        }
        reorgs
    }
}

#[test]
fn genesis_is_head() {
    let harness = Harness::new();
    let head = harness.engine.process_head(Slot::new(0)).unwrap();
    assert_eq!(head, harness.genesis_root());
}

#[test]
fn chain_extension_moves_head_without_reorg() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    let block_1 = harness.extend(1, genesis_root);
    let block_2 = harness.extend(2, block_1);

    assert_eq!(harness.engine.store().best_block().root, block_2);
    assert!(harness.reorgs().is_empty());
}

#[test]
fn empty_slot_filled_is_a_reorg() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    // Fork choice advances into slot 1 with no block.
    harness.clock.set_slot(Slot::new(1));
    let head = harness.engine.process_head(Slot::new(1)).unwrap();
    assert_eq!(head, genesis_root);
    assert!(harness.reorgs().is_empty());

    // The empty slot is then filled.
    let block_1 = harness.extend(1, genesis_root);
    harness.engine.process_head(Slot::new(1)).unwrap();

    assert_eq!(
        harness.reorgs(),
        vec![ReorgEvent {
            best_block_root: block_1,
            best_slot: Slot::new(1),
        }]
    );
}

#[test]
fn pure_slot_advancement_is_not_a_reorg() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    for slot in 1..5 {
        harness.clock.set_slot(Slot::new(slot));
        let head = harness.engine.process_head(Slot::new(slot)).unwrap();
        assert_eq!(head, genesis_root);
    }
    assert!(harness.reorgs().is_empty());
}

#[test]
fn duplicate_import_is_idempotent() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    let block = empty_block(Slot::new(1), genesis_root);
    harness.import(block.clone());
    let reorgs_before = harness.reorgs().len();

    let outcome = harness.engine.on_block(&block, None).unwrap();
    assert_eq!(
        outcome,
        ImportOutcome::AlreadyKnown {
            head_root: block.canonical_root()
        }
    );
    assert_eq!(harness.reorgs().len(), reorgs_before);
}

#[test]
fn future_blocks_are_rejected() {
    let harness = Harness::new();
    let block = empty_block(Slot::new(5), harness.genesis_root());

    assert_eq!(
        harness.engine.on_block(&block, None),
        Err(BlockError::BlockIsFromFuture {
            block_slot: Slot::new(5),
            current_slot: Slot::new(0),
        })
    );
}

#[test]
fn unknown_parents_are_rejected() {
    let harness = Harness::new();
    harness.clock.set_slot(Slot::new(1));
    let orphan = empty_block(Slot::new(1), Hash256::repeat_byte(0xab));

    assert_eq!(
        harness.engine.on_block(&orphan, None),
        Err(BlockError::ParentUnknown {
            parent_root: Hash256::repeat_byte(0xab),
        })
    );
}

/// Two competing children of genesis; the vote-heavy branch wins.
#[test]
fn votes_decide_between_forks() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    let block_a = harness.import(empty_block(Slot::new(1), genesis_root));
    let block_b = harness.import({
        let mut block = empty_block(Slot::new(1), genesis_root);
        block.message.proposer_index = 9;
        block
    });
    assert_ne!(block_a, block_b);

    // The first import won the head by the fast path; the second left it.
    assert_eq!(harness.engine.store().best_block().root, block_a);

    // A majority votes for the other branch.
    harness.clock.set_slot(Slot::new(2));
    harness.attest((0..12).collect(), block_b, 1);

    let head = harness.engine.process_head(Slot::new(2)).unwrap();
    assert_eq!(head, block_b);

    let reorgs = harness.reorgs();
    assert_eq!(
        reorgs.last(),
        Some(&ReorgEvent {
            best_block_root: block_b,
            best_slot: Slot::new(2),
        })
    );
}

/// With no votes at all, the greater root wins.
#[test]
fn ties_break_toward_the_greater_root() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    let block_a = harness.import(empty_block(Slot::new(1), genesis_root));
    let block_b = harness.import({
        let mut block = empty_block(Slot::new(1), genesis_root);
        block.message.proposer_index = 9;
        block
    });

    let head = harness.engine.process_head(Slot::new(1)).unwrap();
    assert_eq!(head, std::cmp::max(block_a, block_b));
}

/// The head is a pure function of (blocks, votes): two independent nodes
/// agree.
#[test]
fn head_selection_is_deterministic() {
    let run = || {
        let mut harness = Harness::new();
        let genesis_root = harness.genesis_root();

        let block_a = harness.import(empty_block(Slot::new(1), genesis_root));
        let block_b = harness.import({
            let mut block = empty_block(Slot::new(1), genesis_root);
            block.message.proposer_index = 3;
            block
        });
        let _ = harness.import(empty_block(Slot::new(2), block_a));

        harness.clock.set_slot(Slot::new(3));
        harness.attest(vec![0, 1, 2, 3, 4], block_b, 2);
        harness.attest(vec![5, 6, 7], block_a, 2);

        harness.engine.process_head(Slot::new(3)).unwrap()
    };

    assert_eq!(run(), run());
}

/// Attestations for the current slot only count once the slot has passed.
#[test]
fn current_slot_attestations_are_queued() {
    let mut harness = Harness::new();
    let genesis_root = harness.genesis_root();

    let block_a = harness.import(empty_block(Slot::new(1), genesis_root));
    let block_b = harness.import({
        let mut block = empty_block(Slot::new(1), genesis_root);
        block.message.proposer_index = 9;
        block
    });
    let loser = std::cmp::min(block_a, block_b);

    // Votes arriving in their own slot are parked...
    harness.attest((0..12).collect(), loser, 1);
    assert_eq!(harness.engine.queued_attestation_count(), 1);

    // ...and do not influence the head yet.
    let head = harness.engine.process_head(Slot::new(1)).unwrap();
    assert_eq!(head, std::cmp::max(block_a, block_b));

    // Once the slot passes they apply.
    harness.clock.set_slot(Slot::new(2));
    let head = harness.engine.process_head(Slot::new(2)).unwrap();
    assert_eq!(head, loser);
    assert_eq!(harness.engine.queued_attestation_count(), 0);
}

/// Drives two epochs of supermajority attestations through block bodies and
/// watches justification, finalization and pruning land.
#[test]
fn finalization_prunes_the_hot_tree() {
    let mut harness = Harness::new();
    let slots_per_epoch = E::slots_per_epoch();
    assert_eq!(slots_per_epoch, 8, "test is written for the minimal preset");

    let mut parent = harness.genesis_root();
    let mut roots = vec![parent];
    for slot in 1..=16 {
        parent = harness.extend(slot, parent);
        roots.push(parent);
    }
    let epoch_2_start = roots[16];

    // One attestation from every validator for the epoch 2 boundary block.
    let all: Vec<u64> = (0..VALIDATOR_COUNT as u64).collect();
    let mut block_17 = empty_block(Slot::new(17), parent);
    block_17.message.body.attestations.push(IndexedAttestation {
        attesting_indices: all.clone(),
        data: AttestationData {
            slot: Slot::new(16),
            beacon_block_root: epoch_2_start,
            source: Checkpoint::default(),
            target: Checkpoint {
                epoch: Epoch::new(2),
                root: epoch_2_start,
            },
        },
    });
    parent = harness.import(block_17);

    for slot in 18..=24 {
        parent = harness.extend(slot, parent);
        if slot == 24 {
            // Crossing the epoch 2 → 3 boundary justified epoch 2.
            assert_eq!(
                harness.engine.store().justified_checkpoint(),
                Checkpoint::new(Epoch::new(2), epoch_2_start),
            );
        }
    }
    let epoch_3_start = parent;

    let mut block_25 = empty_block(Slot::new(25), parent);
    block_25.message.body.attestations.push(IndexedAttestation {
        attesting_indices: all,
        data: AttestationData {
            slot: Slot::new(24),
            beacon_block_root: epoch_3_start,
            source: Checkpoint::new(Epoch::new(2), epoch_2_start),
            target: Checkpoint {
                epoch: Epoch::new(3),
                root: epoch_3_start,
            },
        },
    });
    parent = harness.import(block_25);

    for slot in 26..=32 {
        parent = harness.extend(slot, parent);
    }

    // Crossing the epoch 3 → 4 boundary finalized epoch 2.
    assert_eq!(
        harness.engine.store().finalized_checkpoint(),
        Checkpoint::new(Epoch::new(2), epoch_2_start),
    );

    // Everything before the finalized block left the hot set; the chain
    // from the finalized block to the head remains.
    assert!(!harness.engine.store().contains_block(harness.genesis_root()));
    assert!(!harness.engine.store().contains_block(roots[15]));
    assert!(harness.engine.store().contains_block(epoch_2_start));
    assert!(harness.engine.store().contains_block(parent));
    assert_eq!(harness.engine.store().best_block().root, parent);

    // The engine still extends the chain normally afterwards.
    let next = harness.extend(33, parent);
    assert_eq!(harness.engine.store().best_block().root, next);
}
