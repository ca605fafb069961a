//! Decides whether a remote peer follows a chain compatible with ours.
//!
//! Runs at handshake time and again whenever a peer sends a fresh status.
//! The decision uses only the peer's advertised status summary plus, in the
//! peer-is-ahead case, a single block-by-slot lookup against the peer.
//!
//! Outcomes:
//!
//! - compatible → the peer stays connected;
//! - provably incompatible → Goodbye with `IrrelevantNetwork`;
//! - could not verify (timeout, remote error) → Goodbye with
//!   `UnableToVerifyNetwork`, the peer may re-dial;
//! - local lookup failure → the error propagates; a block we must have is
//!   missing, which means our own store is corrupt, not the peer.

use crate::metrics;
use crate::rpc::{GoodbyeReason, PeerId, RpcError, StatusMessage};
use crate::service::NetworkMessage;
use crate::status_exchange::StatusExchange;
use slog::{crit, debug, trace, Logger};
use slot_clock::SlotClock;
use std::sync::Arc;
use std::time::Duration;
use store::{ChainReader, StoreError};
use tokio::sync::mpsc;
use types::{EthSpec, Slot, GENESIS_EPOCH, GENESIS_SLOT};

/// An unrecoverable local failure: a historical block that must exist could
/// not be resolved. The peer is not at fault.
#[derive(Debug, PartialEq, Clone)]
pub enum ValidationError {
    LocalChainCorrupt(StoreError),
}

/// Why a peer was judged incompatible.
#[derive(Debug, PartialEq, Clone)]
enum Incompatibility {
    ForkDigestMismatch,
    /// The peer claims finality in an epoch we have not reached.
    FutureFinality,
    /// The peer's finalized root conflicts with our chain.
    DifferentFinalizedChain,
    /// The peer answered the block-by-slot request with nothing or with a
    /// block at the wrong slot.
    RpcViolation,
}

enum CheckOutcome {
    Compatible,
    Incompatible(Incompatibility),
}

enum CheckFailure {
    Transient(RpcError),
    Fatal(StoreError),
}

pub struct PeerChainValidator<E: EthSpec, S: SlotClock, X: StatusExchange> {
    chain: Arc<ChainReader<E, S>>,
    exchange: Arc<X>,
    network_tx: mpsc::UnboundedSender<NetworkMessage>,
    rpc_timeout: Duration,
    log: Logger,
}

impl<E: EthSpec, S: SlotClock, X: StatusExchange> PeerChainValidator<E, S, X> {
    pub fn new(
        chain: Arc<ChainReader<E, S>>,
        exchange: Arc<X>,
        network_tx: mpsc::UnboundedSender<NetworkMessage>,
        rpc_timeout: Duration,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            exchange,
            network_tx,
            rpc_timeout,
            log,
        }
    }

    /// Resolves `true` iff the peer's chain is compatible with ours and the
    /// peer may remain connected. On `false` a Goodbye has been dispatched.
    ///
    /// Dropping the returned future before completion sends nothing: the
    /// disconnect decision is only made once the checks have finished.
    pub async fn validate(
        &self,
        peer_id: PeerId,
        remote: StatusMessage,
    ) -> Result<bool, ValidationError> {
        metrics::inc_counter_vec(
            &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
            &[metrics::VALIDATION_STARTED],
        );
        let timer = metrics::start_timer(&metrics::PEER_CHAIN_VALIDATION_SECONDS);

        let result = self.check_peer_relevance(peer_id, &remote).await;
        metrics::stop_timer(timer);

        match result {
            Ok(CheckOutcome::Compatible) => {
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    &[metrics::VALIDATION_VALID],
                );
                trace!(self.log, "Peer chain accepted"; "peer" => %peer_id);
                Ok(true)
            }
            Ok(CheckOutcome::Incompatible(reason)) => {
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    &[metrics::VALIDATION_INVALID],
                );
                debug!(
                    self.log, "Peer on irrelevant network";
                    "peer" => %peer_id,
                    "reason" => ?reason,
                );
                self.disconnect(peer_id, GoodbyeReason::IrrelevantNetwork);
                Ok(false)
            }
            Err(CheckFailure::Transient(error)) => {
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    &[metrics::VALIDATION_ERROR],
                );
                debug!(
                    self.log, "Unable to verify peer chain";
                    "peer" => %peer_id,
                    "error" => %error,
                );
                self.disconnect(peer_id, GoodbyeReason::UnableToVerifyNetwork);
                Ok(false)
            }
            Err(CheckFailure::Fatal(error)) => {
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    &[metrics::VALIDATION_ERROR],
                );
                crit!(
                    self.log, "Local historical block missing during peer validation";
                    "peer" => %peer_id,
                    "error" => ?error,
                );
                Err(ValidationError::LocalChainCorrupt(error))
            }
        }
    }

    async fn check_peer_relevance(
        &self,
        peer_id: PeerId,
        remote: &StatusMessage,
    ) -> Result<CheckOutcome, CheckFailure> {
        let local_digest = self.chain.fork_digest().map_err(CheckFailure::Fatal)?;
        if remote.fork_digest != local_digest {
            return Ok(CheckOutcome::Incompatible(
                Incompatibility::ForkDigestMismatch,
            ));
        }

        // Only the genesis checkpoint is finalized on the remote; the digest
        // match is all there is to check.
        if remote.finalized_epoch == GENESIS_EPOCH {
            return Ok(CheckOutcome::Compatible);
        }

        let current_epoch = self.chain.current_epoch();
        if remote.finalized_epoch > current_epoch
            || (remote.finalized_epoch == current_epoch && current_epoch != GENESIS_EPOCH)
        {
            return Ok(CheckOutcome::Incompatible(Incompatibility::FutureFinality));
        }

        let local = self.chain.finalized_checkpoint();

        if local.epoch == remote.finalized_epoch {
            return if local.root == remote.finalized_root {
                Ok(CheckOutcome::Compatible)
            } else {
                Ok(CheckOutcome::Incompatible(
                    Incompatibility::DifferentFinalizedChain,
                ))
            };
        }

        if local.epoch > remote.finalized_epoch {
            // We are ahead: their finalized block must be on our canonical
            // chain. A failure here is ours, not theirs.
            let start_slot = remote
                .finalized_epoch
                .start_slot(E::slots_per_epoch());
            let local_root = self
                .chain
                .block_root_in_effect_at_slot(start_slot)
                .map_err(CheckFailure::Fatal)?;

            return if local_root == remote.finalized_root {
                Ok(CheckOutcome::Compatible)
            } else {
                Ok(CheckOutcome::Incompatible(
                    Incompatibility::DifferentFinalizedChain,
                ))
            };
        }

        // The peer is ahead: our finalized block must be on their chain. If
        // our finalized block is genesis the digest check already covers it.
        let finalized_slot = self.chain.finalized_slot();
        if finalized_slot == GENESIS_SLOT {
            return Ok(CheckOutcome::Compatible);
        }

        let local_root = local.root;
        self.remote_block_matches(peer_id, finalized_slot, local_root)
            .await
    }

    /// Requests the peer's block at `slot` and compares it against
    /// `expected_root`. We only ever query a slot our own chain has a block
    /// at, so an empty or wrong-slot response is a protocol violation.
    async fn remote_block_matches(
        &self,
        peer_id: PeerId,
        slot: Slot,
        expected_root: types::Hash256,
    ) -> Result<CheckOutcome, CheckFailure> {
        let request = self.exchange.block_by_slot(peer_id, slot);
        let block = tokio::time::timeout(self.rpc_timeout, request)
            .await
            .map_err(|_| CheckFailure::Transient(RpcError::Timeout))?
            .map_err(CheckFailure::Transient)?;

        match block {
            Some(block) if block.slot() != slot => {
                debug!(
                    self.log, "Peer responded with block at wrong slot";
                    "peer" => %peer_id,
                    "requested" => %slot,
                    "received" => %block.slot(),
                );
                Ok(CheckOutcome::Incompatible(Incompatibility::RpcViolation))
            }
            Some(block) => {
                if block.canonical_root() == expected_root {
                    Ok(CheckOutcome::Compatible)
                } else {
                    Ok(CheckOutcome::Incompatible(
                        Incompatibility::DifferentFinalizedChain,
                    ))
                }
            }
            None => {
                debug!(
                    self.log, "Peer has no block at a slot our chain finalized";
                    "peer" => %peer_id,
                    "slot" => %slot,
                );
                Ok(CheckOutcome::Incompatible(Incompatibility::RpcViolation))
            }
        }
    }

    fn disconnect(&self, peer_id: PeerId, reason: GoodbyeReason) {
        debug!(
            self.log, "Disconnecting peer";
            "peer" => %peer_id,
            "reason" => %reason,
        );
        let _ = self
            .network_tx
            .send(NetworkMessage::Disconnect { peer_id, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use sloggers::null::NullLoggerBuilder;
    use sloggers::Build;
    use slot_clock::ManualSlotClock;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use store::Store;
    use types::test_utils::{genesis_state, random_root};
    use types::{
        compute_fork_digest, BeaconState, ChainSpec, Epoch, EthSpec, ForkDigest, Hash256,
        MinimalEthSpec, SignatureBytes, SignedBeaconBlock,
    };

    type E = MinimalEthSpec;

    struct MockExchange {
        responses: Mutex<VecDeque<Result<Option<SignedBeaconBlock>, RpcError>>>,
        requests: Mutex<Vec<(PeerId, Slot)>>,
        hang: AtomicBool,
    }

    impl MockExchange {
        fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(vec![]),
                hang: AtomicBool::new(false),
            }
        }

        fn push_response(&self, response: Result<Option<SignedBeaconBlock>, RpcError>) {
            self.responses.lock().push_back(response);
        }

        fn requests(&self) -> Vec<(PeerId, Slot)> {
            self.requests.lock().clone()
        }
    }

    impl StatusExchange for MockExchange {
        fn block_by_slot(
            &self,
            peer_id: PeerId,
            slot: Slot,
        ) -> BoxFuture<'static, Result<Option<SignedBeaconBlock>, RpcError>> {
            self.requests.lock().push((peer_id, slot));
            if self.hang.load(Ordering::Relaxed) {
                return Box::pin(futures::future::pending());
            }
            let response = self
                .responses
                .lock()
                .pop_front()
                .unwrap_or(Err(RpcError::Disconnected));
            Box::pin(async move { response })
        }
    }

    struct TestRig {
        validator: PeerChainValidator<E, ManualSlotClock, MockExchange>,
        exchange: Arc<MockExchange>,
        network_rx: mpsc::UnboundedReceiver<NetworkMessage>,
        clock: ManualSlotClock,
        anchor_block: SignedBeaconBlock,
        local_digest: ForkDigest,
    }

    impl TestRig {
        /// A node whose finalized checkpoint sits at `finalized_epoch`, with
        /// every historical block-root slot resolving to `historical_root`.
        fn new(finalized_epoch: u64, historical_root: Hash256) -> Self {
            let spec = ChainSpec::minimal();
            let mut state: BeaconState<E> = genesis_state(4, &spec);
            state.slot = Epoch::new(finalized_epoch).start_slot(E::slots_per_epoch());
            for root in state.block_roots.iter_mut() {
                *root = historical_root;
            }

            let mut block = SignedBeaconBlock {
                message: Default::default(),
                signature: SignatureBytes::empty(),
            };
            block.message.slot = state.slot;
            state.latest_block_header = block.message.temporary_block_header();
            block.message.state_root = state.canonical_root();

            let local_digest = state.fork_digest();
            let log = NullLoggerBuilder.build().unwrap();
            let (store, _storage_rx) = Store::from_anchor(block.clone(), state, log.clone());

            let clock = ManualSlotClock::new(
                Slot::new(0),
                Duration::from_secs(0),
                spec.slot_duration(),
            );
            let chain = Arc::new(ChainReader::new(Arc::new(store), clock.clone()));
            let exchange = Arc::new(MockExchange::new());
            let (network_tx, network_rx) = mpsc::unbounded_channel();

            let validator = PeerChainValidator::new(
                chain,
                exchange.clone(),
                network_tx,
                Duration::from_millis(50),
                log,
            );

            Self {
                validator,
                exchange,
                network_rx,
                clock,
                anchor_block: block,
                local_digest,
            }
        }

        fn at_epoch(self, epoch: u64) -> Self {
            self.clock
                .set_slot(Epoch::new(epoch).start_slot(E::slots_per_epoch()));
            self
        }

        fn remote_status(&self, finalized_epoch: u64, finalized_root: Hash256) -> StatusMessage {
            StatusMessage {
                fork_digest: self.local_digest,
                finalized_root,
                finalized_epoch: Epoch::new(finalized_epoch),
                head_root: random_root(),
                head_slot: Epoch::new(finalized_epoch).start_slot(E::slots_per_epoch()),
            }
        }

        fn disconnect_reason(&mut self) -> Option<GoodbyeReason> {
            match self.network_rx.try_recv() {
                Ok(NetworkMessage::Disconnect { reason, .. }) => Some(reason),
                _ => None,
            }
        }

        fn counter(&self, status: &str) -> u64 {
            metrics::get_counter_vec_value(&metrics::PEER_CHAIN_VALIDATION_ATTEMPTS, &[status])
        }
    }

    /// A block a peer could return for a block-by-slot request.
    fn remote_block(slot: u64, proposer: u64) -> SignedBeaconBlock {
        let mut block = SignedBeaconBlock::default();
        block.message.slot = Slot::new(slot);
        block.message.proposer_index = proposer;
        block
    }

    #[tokio::test]
    async fn s1_fork_digest_mismatch_rejects() {
        let mut rig = TestRig::new(0, Hash256::zero());
        let invalid_before = rig.counter(metrics::VALIDATION_INVALID);

        let mut remote = rig.remote_status(9, random_root());
        remote.fork_digest = compute_fork_digest([0xde, 0xad, 0xbe, 0xef], Hash256::zero());

        let accepted = rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap();

        assert!(!accepted);
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );
        assert_eq!(rig.counter(metrics::VALIDATION_INVALID), invalid_before + 1);
        assert!(rig.exchange.requests().is_empty());
    }

    #[tokio::test]
    async fn s2_remote_genesis_finality_accepts_on_digest_alone() {
        let mut rig = TestRig::new(0, Hash256::zero()).at_epoch(4);
        let valid_before = rig.counter(metrics::VALIDATION_VALID);

        // Roots are arbitrary; only the digest matters at epoch 0.
        let remote = rig.remote_status(0, random_root());
        let accepted = rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap();

        assert!(accepted);
        assert_eq!(rig.disconnect_reason(), None);
        assert_eq!(rig.counter(metrics::VALIDATION_VALID), valid_before + 1);
        assert!(rig.exchange.requests().is_empty());
    }

    #[tokio::test]
    async fn future_finality_rejects() {
        let mut rig = TestRig::new(0, Hash256::zero()).at_epoch(1);

        // Beyond the current epoch.
        let remote = rig.remote_status(5, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );

        // Equal to the current epoch (outside the genesis carve-out).
        let remote = rig.remote_status(1, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );
    }

    #[tokio::test]
    async fn genesis_node_accepts_genesis_finality_despite_equal_epochs() {
        // At the genesis epoch, a remote finalized epoch of 0 equals the
        // current epoch but is still acceptable.
        let mut rig = TestRig::new(0, Hash256::zero()).at_epoch(0);

        let remote = rig.remote_status(0, random_root());
        assert!(rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(rig.disconnect_reason(), None);
    }

    #[tokio::test]
    async fn s3_equal_epochs_and_roots_accept() {
        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(10);
        let local_root = rig.anchor_block.canonical_root();

        let remote = rig.remote_status(5, local_root);
        assert!(rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(rig.disconnect_reason(), None);
        assert!(rig.exchange.requests().is_empty());
    }

    #[tokio::test]
    async fn s4_equal_epochs_differing_roots_reject() {
        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(10);

        let remote = rig.remote_status(5, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );
    }

    #[tokio::test]
    async fn s5_local_lookup_decides_when_we_are_ahead() {
        let expected = random_root();

        // Our history resolves the remote's finalized slot to `expected`.
        let mut rig = TestRig::new(10, expected).at_epoch(10);
        let remote = rig.remote_status(5, expected);
        assert!(rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert!(rig.exchange.requests().is_empty());

        // Same chain shape but the remote claims a different root.
        let remote = rig.remote_status(5, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );
    }

    #[tokio::test]
    async fn missing_local_history_is_fatal() {
        // Finalized at epoch 10 (slot 80); the ring no longer covers slot 8.
        let mut rig = TestRig::new(10, random_root()).at_epoch(10);
        let error_before = rig.counter(metrics::VALIDATION_ERROR);

        let remote = rig.remote_status(1, random_root());
        let result = rig.validator.validate(PeerId::random(), remote).await;

        assert!(matches!(
            result,
            Err(ValidationError::LocalChainCorrupt(_))
        ));
        assert_eq!(rig.counter(metrics::VALIDATION_ERROR), error_before + 1);
        // The peer was not blamed.
        assert_eq!(rig.disconnect_reason(), None);
    }

    #[tokio::test]
    async fn s6_remote_lookup_decides_when_peer_is_ahead() {
        let finalized_slot = Epoch::new(5).start_slot(E::slots_per_epoch());

        // Accept: the peer returns exactly our finalized block.
        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(12);
        rig.exchange
            .push_response(Ok(Some(rig.anchor_block.clone())));
        let remote = rig.remote_status(10, random_root());
        assert!(rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        let requests = rig.exchange.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, finalized_slot);

        // Reject: same slot, different block.
        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(12);
        rig.exchange
            .push_response(Ok(Some(remote_block(finalized_slot.as_u64(), 7))));
        let remote = rig.remote_status(10, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );
    }

    #[tokio::test]
    async fn s6_wrong_slot_and_empty_responses_are_violations() {
        let finalized_slot = Epoch::new(5).start_slot(E::slots_per_epoch());

        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(12);
        rig.exchange
            .push_response(Ok(Some(remote_block(finalized_slot.as_u64() - 1, 0))));
        let remote = rig.remote_status(10, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );

        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(12);
        rig.exchange.push_response(Ok(None));
        let remote = rig.remote_status(10, random_root());
        assert!(!rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::IrrelevantNetwork)
        );
    }

    #[tokio::test]
    async fn s6_timeout_is_unable_to_verify() {
        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(12);
        rig.exchange.hang.store(true, Ordering::Relaxed);
        let error_before = rig.counter(metrics::VALIDATION_ERROR);

        let remote = rig.remote_status(10, random_root());
        let accepted = rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap();

        assert!(!accepted);
        assert_eq!(
            rig.disconnect_reason(),
            Some(GoodbyeReason::UnableToVerifyNetwork)
        );
        assert_eq!(rig.counter(metrics::VALIDATION_ERROR), error_before + 1);
    }

    #[tokio::test]
    async fn peer_ahead_of_genesis_node_accepts_without_rpc() {
        let mut rig = TestRig::new(0, Hash256::zero()).at_epoch(9);

        // Our finalized block is at the genesis slot; the digest check is
        // all the assurance a remote lookup could add.
        let remote = rig.remote_status(5, random_root());
        assert!(rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap());
        assert_eq!(rig.disconnect_reason(), None);
        assert!(rig.exchange.requests().is_empty());
    }

    #[tokio::test]
    async fn identical_statuses_validate_identically() {
        let mut rig = TestRig::new(5, Hash256::zero()).at_epoch(10);
        let remote = rig.remote_status(5, rig.anchor_block.canonical_root());

        let first = rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap();
        let second = rig
            .validator
            .validate(PeerId::random(), remote)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first);
        assert_eq!(rig.disconnect_reason(), None);
    }
}
