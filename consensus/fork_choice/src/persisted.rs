//! Snapshot of the engine-local state that does not live in the store,
//! allowing the engine to be reconstructed after a restart. The store itself
//! is recovered by the durable backend from its `StorageUpdate` history.

use crate::fork_choice::QueuedAttestation;
use crate::{Error, EventHandler, ForkChoice};
use slog::Logger;
use slot_clock::SlotClock;
use ssz::{Decode, DecodeError, Encode};
use ssz_derive::{Decode, Encode};
use std::sync::Arc;
use store::Store;
use types::{EthSpec, Hash256, Slot};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PersistedForkChoice {
    pub time: Slot,
    pub best_block_root: Hash256,
    pub best_block_slot: Slot,
    pub queued_attestations: Vec<QueuedAttestation>,
}

impl PersistedForkChoice {
    pub fn as_bytes(&self) -> Vec<u8> {
        self.as_ssz_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_ssz_bytes(bytes)
    }
}

impl<E: EthSpec, S: SlotClock> ForkChoice<E, S> {
    /// Takes a snapshot of the engine-local state.
    pub fn to_persisted(&self) -> PersistedForkChoice {
        let best_block = self.store().best_block();
        PersistedForkChoice {
            time: self.store().time(),
            best_block_root: best_block.root,
            best_block_slot: best_block.slot,
            queued_attestations: self.queued_attestations(),
        }
    }

    /// Reconstructs an engine around a recovered store.
    pub fn from_persisted(
        persisted: PersistedForkChoice,
        store: Arc<Store<E>>,
        slot_clock: S,
        events: Arc<EventHandler>,
        log: Logger,
    ) -> Result<Self, Error> {
        let engine = Self::new(store, slot_clock, events, log);

        let mut tx = engine.store().transaction();
        tx.set_time(persisted.time);
        tx.set_best_block(persisted.best_block_root, persisted.best_block_slot);
        tx.commit()?;

        engine.restore_queued_attestations(persisted.queued_attestations);

        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Epoch;

    #[test]
    fn ssz_round_trip() {
        let persisted = PersistedForkChoice {
            time: Slot::new(42),
            best_block_root: Hash256::repeat_byte(3),
            best_block_slot: Slot::new(41),
            queued_attestations: vec![QueuedAttestation {
                slot: Slot::new(42),
                attesting_indices: vec![0, 5],
                block_root: Hash256::repeat_byte(1),
                target_epoch: Epoch::new(5),
            }],
        };

        let bytes = persisted.as_bytes();
        assert_eq!(PersistedForkChoice::from_bytes(&bytes).unwrap(), persisted);
    }
}
