//! Peer-facing chain coordination: the status handshake vocabulary and the
//! peer chain validator. Wire transport, discovery and gossip live in the
//! external networking stack behind the [`StatusExchange`] seam.

#[macro_use]
extern crate lazy_static;

mod metrics;
pub mod peer_chain_validator;
pub mod router;
pub mod rpc;
pub mod service;
pub mod status;
pub mod status_exchange;

pub use crate::peer_chain_validator::{PeerChainValidator, ValidationError};
pub use crate::router::Router;
pub use crate::rpc::{GoodbyeReason, PeerId, RpcError, StatusMessage};
pub use crate::service::NetworkMessage;
pub use crate::status::local_status;
pub use crate::status_exchange::StatusExchange;
