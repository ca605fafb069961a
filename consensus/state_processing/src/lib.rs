//! The state transition function, split the standard way: per-slot
//! processing (including epoch processing on epoch boundaries) and per-block
//! processing.
//!
//! Only the transition steps the chain coordination core observes are
//! implemented: header bookkeeping, attestation accumulation and FFG
//! justification/finalization. Rewards, penalties and registry updates are
//! the business of the full state-transition collaborator.

pub mod errors;
pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;

pub use crate::errors::{AttestationInvalid, BlockProcessingError, SlotProcessingError};
pub use crate::per_block_processing::per_block_processing;
pub use crate::per_epoch_processing::process_justification_and_finalization;
pub use crate::per_slot_processing::process_slots;
