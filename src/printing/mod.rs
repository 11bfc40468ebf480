//! Label rendering and printer submission.

pub mod labels;
pub mod printer;

pub use labels::TextLabelRenderer;
pub use printer::{LprPrinter, PrintJob, DEFAULT_MEDIA, MAX_COPIES};

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::ServiceError;
use crate::models::Shipment;

/// A rendered label file ready to be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub path: PathBuf,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelRenderer: Send + Sync {
    async fn preparation_label(&self, shipment: &Shipment) -> Result<Label, ServiceError>;

    async fn partner_info_label(&self, shipment: &Shipment) -> Result<Label, ServiceError>;

    /// One page per unit load. Fails when the shipment has none.
    async fn unit_load_labels(&self, shipment: &Shipment) -> Result<Label, ServiceError>;

    async fn entry_barcode(&self, entry_id: &str) -> Result<Label, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Printer: Send + Sync {
    async fn print(&self, job: PrintJob, labels: Vec<Label>) -> Result<(), ServiceError>;
}
