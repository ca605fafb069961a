//! The slot-driven duty pipeline: typed events, bounded actor inboxes and
//! the actors that turn slot ticks into attestations and blocks.

#[macro_use]
extern crate lazy_static;

pub mod actors;
pub mod events;
pub mod inbox;
mod metrics;
pub mod mesh;

pub use crate::actors::{Actor, BeaconAttester, BlockProposer, DelayedAttestationsProcessor};
pub use crate::events::MeshEvent;
pub use crate::inbox::Inbox;
pub use crate::mesh::{spawn_slot_ticker, EventMesh, EventPublisher, DEFAULT_INBOX_CAPACITY};
