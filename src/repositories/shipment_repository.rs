use std::sync::Arc;
use tracing::{debug, instrument};

use crate::errors::ServiceError;
use crate::models::shipment::{
    BackendShipment, Shipment, ShipmentStatus, TransferPoints, SHIPMENT_PORTALS,
};
use crate::queries::{RequestMeta, ResponseMeta, SHIPMENT_FIELDS};
use crate::store::{list_records, single_record, FindQuery, Record, RecordStore, StoreError};

use super::exact;

pub const SHIPMENT_LAYOUT: &str = "warehouse_shipment_single";
const PENDING_UPDATE_FIELD: &str = "has_unsent_update";

/// Shipments departing from the configured warehouse.
#[derive(Clone)]
pub struct ShipmentRepository {
    store: Arc<dyn RecordStore>,
    warehouse: String,
    transfer_points: Arc<TransferPoints>,
}

impl ShipmentRepository {
    pub fn new(
        store: Arc<dyn RecordStore>,
        warehouse: impl Into<String>,
        transfer_points: TransferPoints,
    ) -> Self {
        Self {
            store,
            warehouse: warehouse.into(),
            transfer_points: Arc::new(transfer_points),
        }
    }

    fn base_query(&self) -> FindQuery {
        FindQuery::new(SHIPMENT_LAYOUT)
            .with_criterion("Departure_Warehouse", exact(&self.warehouse))
            .with_portals(&SHIPMENT_PORTALS)
    }

    fn to_domain(&self, records: &[Record]) -> Result<Vec<Shipment>, StoreError> {
        records
            .iter()
            .map(|r| BackendShipment::from_record(r).map(|s| s.to_domain(&self.transfer_points)))
            .collect()
    }

    /// Shipments being prepared or packed.
    #[instrument(skip(self, meta))]
    pub async fn list(
        &self,
        meta: RequestMeta,
    ) -> Result<(Vec<Shipment>, ResponseMeta), ServiceError> {
        let meta = SHIPMENT_FIELDS.translate(meta);
        let query = self.base_query().with_criterion(
            "ShipmentStatus_number",
            format!(
                "{}...{}",
                ShipmentStatus::Preparation.key(),
                ShipmentStatus::Packed.key()
            ),
        );

        let (records, response_meta) = list_records(self.store.as_ref(), query, &meta).await?;
        Ok((self.to_domain(&records)?, response_meta))
    }

    #[instrument(skip(self))]
    pub async fn by_code(&self, code: &str) -> Result<Shipment, ServiceError> {
        let query = FindQuery::new(SHIPMENT_LAYOUT)
            .with_criterion("code", exact(code))
            .with_portals(&SHIPMENT_PORTALS);
        let record = single_record(self.store.as_ref(), query)
            .await
            .map_err(|err| match err {
                StoreError::NoRecordsMatch => ServiceError::NotFound(format!("shipment {}", code)),
                other => other.into(),
            })?;
        Ok(BackendShipment::from_record(&record)?.to_domain(&self.transfer_points))
    }

    /// Shipments the backend marked as changed and not yet pushed to clients.
    pub async fn pending_updates(&self) -> Result<Vec<Shipment>, ServiceError> {
        let query = self
            .base_query()
            .with_criterion(PENDING_UPDATE_FIELD, exact("1"));
        let (records, meta) =
            list_records(self.store.as_ref(), query, &RequestMeta::default()).await?;
        debug!(count = meta.count, "fetched pending shipment updates");
        Ok(self.to_domain(&records)?)
    }
}
