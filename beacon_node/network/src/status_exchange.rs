//! The seam between the chain core and the wire-level RPC stack.

use crate::rpc::{PeerId, RpcError};
use futures::future::BoxFuture;
use types::{SignedBeaconBlock, Slot};

/// Issues block-by-slot requests against a remote peer.
///
/// Semantics expected of implementations: resolve with the peer's canonical
/// block at exactly `slot`, or `None` when the peer has no block there. The
/// future must be safe to drop before completion (cancellation must not leak
/// the request).
pub trait StatusExchange: Send + Sync + 'static {
    fn block_by_slot(
        &self,
        peer_id: PeerId,
        slot: Slot,
    ) -> BoxFuture<'static, Result<Option<SignedBeaconBlock>, RpcError>>;
}
