//! The RPC vocabulary the chain core speaks.
//!
//! Wire framing, multiplexing and transport identity live in the external
//! networking stack; this module only defines the containers and reasons the
//! core produces and consumes.

use rand::Rng;
use ssz_derive::{Decode, Encode};
use std::fmt;
use types::{Epoch, ForkDigest, Hash256, Slot};

/// An opaque handle for a connected peer, assigned by the transport layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 16]);

impl PeerId {
    pub fn random() -> Self {
        Self(rand::thread_rng().gen())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(self.0))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The handshake summary a node advertises about its chain. Supplied by the
/// remote peer and therefore untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct StatusMessage {
    pub fork_digest: ForkDigest,
    pub finalized_root: Hash256,
    pub finalized_epoch: Epoch,
    pub head_root: Hash256,
    pub head_slot: Slot,
}

/// The reason attached to a Goodbye message when disconnecting a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodbyeReason {
    ClientShutdown,
    /// The peer follows a chain we are not part of.
    IrrelevantNetwork,
    Fault,
    /// We could not confirm chain compatibility; the peer may re-dial.
    UnableToVerifyNetwork,
    TooManyPeers,
    Unknown,
}

impl From<u64> for GoodbyeReason {
    fn from(id: u64) -> GoodbyeReason {
        match id {
            1 => GoodbyeReason::ClientShutdown,
            2 => GoodbyeReason::IrrelevantNetwork,
            3 => GoodbyeReason::Fault,
            128 => GoodbyeReason::UnableToVerifyNetwork,
            129 => GoodbyeReason::TooManyPeers,
            _ => GoodbyeReason::Unknown,
        }
    }
}

impl From<GoodbyeReason> for u64 {
    fn from(reason: GoodbyeReason) -> u64 {
        match reason {
            GoodbyeReason::ClientShutdown => 1,
            GoodbyeReason::IrrelevantNetwork => 2,
            GoodbyeReason::Fault => 3,
            GoodbyeReason::UnableToVerifyNetwork => 128,
            GoodbyeReason::TooManyPeers => 129,
            GoodbyeReason::Unknown => 0,
        }
    }
}

impl fmt::Display for GoodbyeReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GoodbyeReason::ClientShutdown => write!(f, "client shutdown"),
            GoodbyeReason::IrrelevantNetwork => write!(f, "irrelevant network"),
            GoodbyeReason::Fault => write!(f, "fault"),
            GoodbyeReason::UnableToVerifyNetwork => write!(f, "unable to verify network"),
            GoodbyeReason::TooManyPeers => write!(f, "too many peers"),
            GoodbyeReason::Unknown => write!(f, "unknown"),
        }
    }
}

/// Failures surfaced by an outbound RPC request.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The per-call deadline expired.
    Timeout,
    /// The peer went away before answering.
    Disconnected,
    /// The peer answered with an error response.
    RemoteError(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RpcError::Timeout => write!(f, "request timed out"),
            RpcError::Disconnected => write!(f, "peer disconnected"),
            RpcError::RemoteError(reason) => write!(f, "remote error: {}", reason),
        }
    }
}
