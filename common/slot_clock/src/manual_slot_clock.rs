use crate::SlotClock;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use types::Slot;

/// A slot clock set by hand, for testing.
#[derive(Clone)]
pub struct ManualSlotClock {
    genesis_slot: Slot,
    slot_duration: Duration,
    current_slot: Arc<RwLock<Slot>>,
}

impl ManualSlotClock {
    /// Sets the returned slot to `slot`.
    pub fn set_slot(&self, slot: Slot) {
        *self.current_slot.write() = slot;
    }

    /// Advances the returned slot by one.
    pub fn advance_slot(&self) {
        let slot = *self.current_slot.read();
        self.set_slot(slot + 1)
    }
}

impl SlotClock for ManualSlotClock {
    fn new(genesis_slot: Slot, _genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            genesis_slot,
            slot_duration,
            current_slot: Arc::new(RwLock::new(genesis_slot)),
        }
    }

    fn now(&self) -> Option<Slot> {
        Some(*self.current_slot.read())
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        Some(self.slot_duration)
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }
}
