//! A single-consumer bounded event buffer.
//!
//! Publication never blocks: when the buffer is full the oldest non-critical
//! event is logged and dropped. `NewSlot` is critical and is never dropped,
//! so a stalled actor always learns about slot boundaries.

use crate::events::MeshEvent;
use crate::metrics;
use parking_lot::Mutex;
use slog::{warn, Logger};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

pub struct Inbox {
    name: &'static str,
    capacity: usize,
    queue: Mutex<VecDeque<MeshEvent>>,
    notify: Notify,
    log: Logger,
}

impl Inbox {
    pub fn new(name: &'static str, capacity: usize, log: Logger) -> Arc<Self> {
        assert!(capacity > 0, "inbox capacity must be non-zero");
        Arc::new(Self {
            name,
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            log,
        })
    }

    /// Enqueues an event without blocking, evicting the oldest non-critical
    /// event on overflow.
    pub fn push(&self, event: MeshEvent) {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                if let Some(position) = queue.iter().position(|queued| !queued.is_critical()) {
                    let dropped = queue
                        .remove(position)
                        .expect("position comes from a live iterator");
                    metrics::inc_counter_vec(
                        &metrics::EVENTS_DROPPED_TOTAL,
                        &[dropped.kind()],
                    );
                    warn!(
                        self.log, "Actor inbox overflow";
                        "actor" => self.name,
                        "dropped" => dropped.kind(),
                    );
                }
                // A queue made up entirely of critical events grows past the
                // bound rather than losing a slot boundary.
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Awaits the next event, in publication order.
    pub async fn recv(&self) -> MeshEvent {
        loop {
            if let Some(event) = self.queue.lock().pop_front() {
                return event;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
