//! Messages the chain core hands to the network service task.

use crate::rpc::{GoodbyeReason, PeerId, StatusMessage};

/// Instructions for the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkMessage {
    /// Reply to (or initiate) a status handshake.
    SendStatus {
        peer_id: PeerId,
        status: StatusMessage,
    },
    /// Send a Goodbye carrying `reason` and drop the connection.
    Disconnect {
        peer_id: PeerId,
        reason: GoodbyeReason,
    },
}
