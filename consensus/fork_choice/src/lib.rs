//! Attestation-weighted LMD-GHOST fork choice over the hot block store.

#[macro_use]
extern crate lazy_static;

mod events;
mod fork_choice;
mod metrics;
mod persisted;

pub use crate::events::{EventHandler, EventKind, HeadEvent, ReorgEvent};
pub use crate::fork_choice::{
    BlockError, Error, ForkChoice, ImportOutcome, InvalidAttestation, InvalidBlock,
    QueuedAttestation, TransitionCause, SAFE_SLOTS_TO_UPDATE_JUSTIFIED,
};
pub use crate::persisted::PersistedForkChoice;
