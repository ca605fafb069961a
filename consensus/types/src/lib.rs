//! Types used across the beacon node.
//!
//! The containers mirror the phase 0 consensus types, trimmed to the fields
//! the chain coordination core consumes. SSZ encoding and tree hashing use
//! the `eth2_ssz`/`tree_hash` ecosystem crates; BLS material is carried as
//! opaque bytes since signature verification happens behind an external seam.

#[macro_use]
mod slot_epoch_macros;
#[macro_use]
pub mod hashing;

pub mod attestation;
pub mod beacon_block;
pub mod beacon_state;
pub mod chain_spec;
pub mod checkpoint;
pub mod consts;
pub mod eth_spec;
pub mod fork;
pub mod signature_bytes;
pub mod slot_epoch;
pub mod test_utils;
pub mod validator;
pub mod vote;

pub use crate::attestation::{AttestationData, IndexedAttestation, PendingAttestation};
pub use crate::beacon_block::{BeaconBlock, BeaconBlockBody, BeaconBlockHeader, SignedBeaconBlock};
pub use crate::beacon_state::{BeaconState, BeaconStateError};
pub use crate::chain_spec::ChainSpec;
pub use crate::checkpoint::Checkpoint;
pub use crate::consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH, GENESIS_SLOT};
pub use crate::eth_spec::{EthSpec, MainnetEthSpec, MinimalEthSpec};
pub use crate::fork::{compute_fork_digest, Fork, ForkData, ForkDigest, ForkVersion};
pub use crate::signature_bytes::SignatureBytes;
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::validator::Validator;
pub use crate::vote::Vote;

pub type Hash256 = ethereum_types::H256;
pub type ValidatorIndex = u64;
pub type Gwei = u64;
