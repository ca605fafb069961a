use crate::{Epoch, Slot};

pub const GENESIS_SLOT: Slot = Slot::new(0);
pub const GENESIS_EPOCH: Epoch = Epoch::new(0);

/// An epoch value that never arrives, used for validators without an exit.
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::new(u64::max_value());
