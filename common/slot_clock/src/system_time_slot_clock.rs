use crate::SlotClock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use types::Slot;

/// Determines the present slot from the system clock.
#[derive(Clone, Debug)]
pub struct SystemTimeSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    slot_duration: Duration,
}

impl SystemTimeSlotClock {
    fn duration_since_genesis(&self) -> Option<Duration> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        now.checked_sub(self.genesis_duration)
    }
}

impl SlotClock for SystemTimeSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        assert!(
            slot_duration > Duration::from_secs(0),
            "slot_duration must be greater than zero"
        );

        Self {
            genesis_slot,
            genesis_duration,
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        let since_genesis = self.duration_since_genesis()?;
        let slot = since_genesis.as_millis() / self.slot_duration.as_millis();
        Some(self.genesis_slot + slot as u64)
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        let since_genesis = self.duration_since_genesis()?;
        let millis_per_slot = self.slot_duration.as_millis();
        let into_slot = since_genesis.as_millis() % millis_per_slot;
        Some(Duration::from_millis((millis_per_slot - into_slot) as u64))
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }
}
