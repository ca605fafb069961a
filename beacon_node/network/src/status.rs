//! Builds the local half of the status handshake.

use crate::rpc::StatusMessage;
use slot_clock::SlotClock;
use store::{ChainReader, StoreError};
use types::EthSpec;

/// Summarizes the local chain for a status exchange.
pub fn local_status<E: EthSpec, S: SlotClock>(
    chain: &ChainReader<E, S>,
) -> Result<StatusMessage, StoreError> {
    let finalized = chain.finalized_checkpoint();

    Ok(StatusMessage {
        fork_digest: chain.fork_digest()?,
        finalized_root: finalized.root,
        finalized_epoch: finalized.epoch,
        head_root: chain.head_root(),
        head_slot: chain.head_slot(),
    })
}
