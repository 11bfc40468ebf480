//! Periodic push of changed shipments to live clients.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::errors::ServiceError;
use crate::events::{Handoff, PrintHandoff, ShipmentBroadcaster};
use crate::repositories::ShipmentRepository;

/// Polls the backend for shipments with unsent changes and fans them out.
///
/// Ticks never overlap: the next query starts only after the previous tick
/// has finished, however long the backend takes.
pub struct ShipmentUpdatePoller {
    shipments: ShipmentRepository,
    broadcaster: ShipmentBroadcaster,
    print_handoff: Option<PrintHandoff>,
    interval: Duration,
}

impl ShipmentUpdatePoller {
    pub fn new(
        shipments: ShipmentRepository,
        broadcaster: ShipmentBroadcaster,
        interval: Duration,
    ) -> Self {
        Self {
            shipments,
            broadcaster,
            print_handoff: None,
            interval,
        }
    }

    /// Also hand every batch to the preparation-label worker.
    pub fn with_print_handoff(mut self, handoff: PrintHandoff) -> Self {
        self.print_handoff = Some(handoff);
        self
    }

    /// One poll. Returns the number of shipments in the batch.
    pub async fn tick(&self) -> Result<usize, ServiceError> {
        counter!("shipment_updates.ticks", 1);
        let batch = self.shipments.pending_updates().await?;
        let size = batch.len();
        let message = serde_json::to_string(&batch)?;

        if let Some(handoff) = &self.print_handoff {
            match handoff.offer(batch) {
                Handoff::Accepted => {}
                Handoff::Dropped => debug!(size, "print worker busy, batch dropped"),
                Handoff::Closed => warn!("print worker has stopped"),
            }
        }

        let receivers = self.broadcaster.broadcast(Arc::from(message));
        debug!(size, receivers, "shipment updates broadcast");
        Ok(size)
    }

    /// Ticks until `shutdown` flips or its sender is dropped. A tick in
    /// progress always completes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of an interval completes immediately
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "shipment update poller started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        counter!("shipment_updates.broadcast_failures", 1);
                        error!(error = %err, "failed to get shipment updates");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("shipment update poller stopped");
    }
}
