//! Routes inbound status messages: answer with our own status, then kick off
//! chain validation on a background task so the network loop never blocks on
//! remote lookups.

use crate::metrics;
use crate::peer_chain_validator::PeerChainValidator;
use crate::rpc::{PeerId, StatusMessage};
use crate::service::NetworkMessage;
use crate::status::local_status;
use crate::status_exchange::StatusExchange;
use slog::{debug, warn, Logger};
use slot_clock::SlotClock;
use std::sync::Arc;
use store::ChainReader;
use tokio::sync::mpsc;
use types::EthSpec;

pub struct Router<E: EthSpec, S: SlotClock, X: StatusExchange> {
    chain: Arc<ChainReader<E, S>>,
    validator: Arc<PeerChainValidator<E, S, X>>,
    network_tx: mpsc::UnboundedSender<NetworkMessage>,
    log: Logger,
}

impl<E: EthSpec, S: SlotClock + 'static, X: StatusExchange> Router<E, S, X> {
    pub fn new(
        chain: Arc<ChainReader<E, S>>,
        validator: Arc<PeerChainValidator<E, S, X>>,
        network_tx: mpsc::UnboundedSender<NetworkMessage>,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            validator,
            network_tx,
            log,
        }
    }

    /// Handles a status message from a peer: reply in kind, then validate
    /// the peer's chain.
    pub fn on_status_message(&self, peer_id: PeerId, remote: StatusMessage) {
        metrics::inc_counter(&metrics::STATUS_MESSAGES_RX);
        debug!(
            self.log, "Status received";
            "peer" => %peer_id,
            "finalized_epoch" => %remote.finalized_epoch,
            "head_slot" => %remote.head_slot,
        );

        match local_status(&self.chain) {
            Ok(status) => {
                metrics::inc_counter(&metrics::STATUS_MESSAGES_TX);
                let _ = self
                    .network_tx
                    .send(NetworkMessage::SendStatus { peer_id, status });
            }
            Err(error) => {
                warn!(
                    self.log, "Unable to produce local status";
                    "error" => ?error,
                );
            }
        }

        let validator = self.validator.clone();
        let log = self.log.clone();
        tokio::spawn(async move {
            if let Err(error) = validator.validate(peer_id, remote).await {
                warn!(
                    log, "Peer validation halted";
                    "peer" => %peer_id,
                    "error" => ?error,
                );
            }
        });
    }
}
