//! The `Slot` and `Epoch` newtypes.
//!
//! Wrapping the raw `u64` makes it impossible to mix the two quantities up in
//! function signatures. Arithmetic uses plain operators where overflow is a
//! logic error and `SafeArith`/`saturating_*` elsewhere.

use std::iter::Iterator;

/// Beacon chain slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u64);

/// Beacon chain epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    /// Returns the epoch this slot belongs to.
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }
}

impl Epoch {
    /// Returns the first slot of this epoch.
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    /// Returns the last slot of this epoch.
    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(
            self.0
                .saturating_add(1)
                .saturating_mul(slots_per_epoch)
                .saturating_sub(1),
        )
    }

    /// Iterate over all slots in this epoch.
    pub fn slot_iter(self, slots_per_epoch: u64) -> impl Iterator<Item = Slot> {
        let start = self.start_slot(slots_per_epoch).as_u64();
        (start..start + slots_per_epoch).map(Slot::new)
    }
}
