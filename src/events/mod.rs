//! Live shipment updates: fan-out to socket subscribers and the single-slot
//! handoff to the label printer.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::models::Shipment;

/// Messages a lagging subscriber may fall behind before it starts losing them.
pub const SUBSCRIBER_BUFFER: usize = 16;

/// Serialized batch as sent to socket clients.
pub type UpdateMessage = Arc<str>;

/// Fan-out of serialized shipment batches to every connected client.
#[derive(Debug, Clone)]
pub struct ShipmentBroadcaster {
    sender: broadcast::Sender<UpdateMessage>,
}

impl Default for ShipmentBroadcaster {
    fn default() -> Self {
        Self::new(SUBSCRIBER_BUFFER)
    }
}

impl ShipmentBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sends without waiting on any subscriber. Returns how many received it;
    /// zero subscribers is not a failure.
    pub fn broadcast(&self, message: UpdateMessage) -> usize {
        match self.sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("no live subscribers for shipment update");
                0
            }
        }
    }
}

/// Outcome of handing a batch to the print worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    Accepted,
    /// The worker still holds the previous batch
    Dropped,
    /// The worker is gone
    Closed,
}

/// Single-slot, non-blocking handoff of shipment batches to the print worker.
#[derive(Debug, Clone)]
pub struct PrintHandoff {
    sender: mpsc::Sender<Vec<Shipment>>,
}

impl PrintHandoff {
    pub fn channel() -> (Self, mpsc::Receiver<Vec<Shipment>>) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { sender }, receiver)
    }

    pub fn offer(&self, batch: Vec<Shipment>) -> Handoff {
        match self.sender.try_send(batch) {
            Ok(()) => Handoff::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => Handoff::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Handoff::Closed,
        }
    }
}
