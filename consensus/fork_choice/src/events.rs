//! Broadcast channels carrying chain reorganization, head and finalization
//! events to whoever subscribes (duty scheduling, telemetry).

use slog::{trace, Logger};
use tokio::sync::broadcast::{self, Receiver, Sender};
use types::{Checkpoint, Hash256, Slot};

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// The canonical head moved laterally: the new best block is not on the
/// chain previously declared best.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorgEvent {
    pub best_block_root: Hash256,
    pub best_slot: Slot,
}

/// The canonical head was (re-)declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadEvent {
    pub root: Hash256,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Reorg(ReorgEvent),
    Head(HeadEvent),
    FinalizedCheckpoint(Checkpoint),
}

pub struct EventHandler {
    reorg_tx: Sender<EventKind>,
    head_tx: Sender<EventKind>,
    finalized_tx: Sender<EventKind>,
    log: Logger,
}

impl EventHandler {
    pub fn new(log: Logger) -> Self {
        Self::new_with_capacity(log, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn new_with_capacity(log: Logger, capacity: usize) -> Self {
        let (reorg_tx, _) = broadcast::channel(capacity);
        let (head_tx, _) = broadcast::channel(capacity);
        let (finalized_tx, _) = broadcast::channel(capacity);

        Self {
            reorg_tx,
            head_tx,
            finalized_tx,
            log,
        }
    }

    pub fn register(&self, kind: EventKind) {
        let result = match kind {
            EventKind::Reorg(event) => self.reorg_tx.send(EventKind::Reorg(event)),
            EventKind::Head(event) => self.head_tx.send(EventKind::Head(event)),
            EventKind::FinalizedCheckpoint(checkpoint) => self
                .finalized_tx
                .send(EventKind::FinalizedCheckpoint(checkpoint)),
        };
        if let Err(broadcast::error::SendError(event)) = result {
            trace!(self.log, "No receivers registered to listen for event"; "event" => ?event);
        }
    }

    pub fn subscribe_reorg(&self) -> Receiver<EventKind> {
        self.reorg_tx.subscribe()
    }

    pub fn subscribe_head(&self) -> Receiver<EventKind> {
        self.head_tx.subscribe()
    }

    pub fn subscribe_finalized(&self) -> Receiver<EventKind> {
        self.finalized_tx.subscribe()
    }
}
