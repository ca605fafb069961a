//! The bus wiring actors together.
//!
//! One router task fans every published event out to every actor inbox and
//! external subscriber, preserving publication order. Each actor runs in its
//! own task, consuming its inbox and publishing whatever it derives.

use crate::actors::Actor;
use crate::events::MeshEvent;
use crate::inbox::Inbox;
use crate::metrics;
use parking_lot::Mutex;
use slog::{debug, Logger};
use slot_clock::SlotClock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default number of events an actor inbox holds before shedding load.
pub const DEFAULT_INBOX_CAPACITY: usize = 256;

/// A cloneable handle for publishing onto the bus.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<MeshEvent>,
}

impl EventPublisher {
    /// Publishes without blocking. Returns `false` if the mesh has shut
    /// down.
    pub fn publish(&self, event: MeshEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

pub struct EventMesh {
    publish_tx: mpsc::UnboundedSender<MeshEvent>,
    inboxes: Arc<Mutex<Vec<Arc<Inbox>>>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<MeshEvent>>>>,
    tasks: Vec<JoinHandle<()>>,
    log: Logger,
}

impl EventMesh {
    pub fn new(log: Logger) -> Self {
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel::<MeshEvent>();
        let inboxes: Arc<Mutex<Vec<Arc<Inbox>>>> = Arc::new(Mutex::new(vec![]));
        let subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<MeshEvent>>>> =
            Arc::new(Mutex::new(vec![]));

        let router_inboxes = inboxes.clone();
        let router_subscribers = subscribers.clone();
        let router = tokio::spawn(async move {
            while let Some(event) = publish_rx.recv().await {
                metrics::inc_counter_vec(&metrics::EVENTS_PUBLISHED_TOTAL, &[event.kind()]);
                for inbox in router_inboxes.lock().iter() {
                    inbox.push(event.clone());
                }
                router_subscribers
                    .lock()
                    .retain(|subscriber| subscriber.send(event.clone()).is_ok());
            }
        });

        Self {
            publish_tx,
            inboxes,
            subscribers,
            tasks: vec![router],
            log,
        }
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.publish_tx.clone(),
        }
    }

    pub fn publish(&self, event: MeshEvent) {
        let _ = self.publish_tx.send(event);
    }

    /// Wires an actor into the mesh with its own inbox and task.
    pub fn attach<A: Actor>(&mut self, mut actor: A) {
        let inbox = Inbox::new(actor.name(), DEFAULT_INBOX_CAPACITY, self.log.clone());
        self.inboxes.lock().push(inbox.clone());

        debug!(self.log, "Actor attached"; "actor" => actor.name());

        let publish_tx = self.publish_tx.clone();
        let task = tokio::spawn(async move {
            loop {
                let event = inbox.recv().await;
                for derived in actor.handle(event) {
                    if publish_tx.send(derived).is_err() {
                        return;
                    }
                }
            }
        });
        self.tasks.push(task);
    }

    /// Taps the full event stream, e.g. to feed derived blocks and
    /// attestations into fork choice.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MeshEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for EventMesh {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Publishes `NewSlot` on every slot boundary until the mesh shuts down.
pub fn spawn_slot_ticker<S: SlotClock + 'static>(
    publisher: EventPublisher,
    slot_clock: S,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = slot_clock
                .duration_to_next_slot()
                .unwrap_or_else(|| slot_clock.slot_duration());
            tokio::time::sleep(wait).await;

            if let Some(slot) = slot_clock.now() {
                if !publisher.publish(MeshEvent::NewSlot(slot)) {
                    return;
                }
            }
        }
    })
}
