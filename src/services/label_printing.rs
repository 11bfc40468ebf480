//! Prints the preparation label of each shipment once, when it enters preparation.

use metrics::counter;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument};

use crate::errors::ServiceError;
use crate::models::{Shipment, ShipmentStatus};
use crate::printing::{LabelRenderer, PrintJob, Printer};
use crate::repositories::{PrintedLabelRepository, ShipmentRepository};

#[derive(Clone)]
pub struct PreparationLabelWorker {
    shipments: ShipmentRepository,
    ledger: PrintedLabelRepository,
    renderer: Arc<dyn LabelRenderer>,
    printer: Arc<dyn Printer>,
}

impl PreparationLabelWorker {
    pub fn new(
        shipments: ShipmentRepository,
        ledger: PrintedLabelRepository,
        renderer: Arc<dyn LabelRenderer>,
        printer: Arc<dyn Printer>,
    ) -> Self {
        Self {
            shipments,
            ledger,
            renderer,
            printer,
        }
    }

    /// Handles one batch and returns how many labels were printed. A failure
    /// for one shipment is logged and the rest of the batch continues.
    pub async fn process(&self, batch: Vec<Shipment>) -> usize {
        let _ledger = self.ledger.lock().await;
        let mut printed = 0;

        for shipment in batch {
            match self.print_once(&shipment.code).await {
                Ok(true) => printed += 1,
                Ok(false) => {}
                Err(err) => {
                    counter!("labels.print_failures", 1);
                    error!(code = %shipment.code, error = %err, "failed to print preparation label");
                }
            }
        }
        printed
    }

    /// Caller holds the ledger lock.
    #[instrument(skip(self))]
    async fn print_once(&self, code: &str) -> Result<bool, ServiceError> {
        if self.ledger.is_printed(code).await? {
            return Ok(false);
        }

        // the batch may be stale by now
        let shipment = self.shipments.by_code(code).await?;
        if shipment.status != ShipmentStatus::Preparation {
            debug!(status = %shipment.status, "shipment not in preparation, skipped");
            return Ok(false);
        }

        let label = self.renderer.preparation_label(&shipment).await?;
        self.printer.print(PrintJob::default(), vec![label]).await?;
        self.ledger.record(code).await?;

        counter!("labels.printed", 1);
        info!("preparation label printed");
        Ok(true)
    }

    /// Drains batches until the handoff closes or `shutdown` flips. A batch
    /// in progress always completes.
    pub async fn run(
        self,
        mut batches: mpsc::Receiver<Vec<Shipment>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("preparation label worker started");
        loop {
            tokio::select! {
                batch = batches.recv() => match batch {
                    Some(batch) => {
                        self.process(batch).await;
                    }
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        info!("preparation label worker stopped");
    }
}
