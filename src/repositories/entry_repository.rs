use std::sync::Arc;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::models::entry::{BackendEntry, Entry};
use crate::queries::{RequestMeta, ResponseMeta, ENTRY_FIELDS};
use crate::store::{
    create_record, list_records, single_record, update_record, AuditTrail, FindQuery, RecordStore,
    StoreError,
};

use super::exact;

pub const ENTRY_LAYOUT: &str = "warehouse_entry_single";
const AUDIT_TABLE: &str = "Entries";
const AUDIT_ACTION: &str = "api_edit_record";

/// Entries of the configured warehouse.
#[derive(Clone)]
pub struct EntryRepository {
    store: Arc<dyn RecordStore>,
    warehouse: String,
    account_name: String,
}

impl EntryRepository {
    pub fn new(
        store: Arc<dyn RecordStore>,
        warehouse: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            warehouse: warehouse.into(),
            account_name: account_name.into(),
        }
    }

    /// Unassigned, unused entries of this warehouse.
    #[instrument(skip(self, meta))]
    pub async fn list(&self, meta: RequestMeta) -> Result<(Vec<Entry>, ResponseMeta), ServiceError> {
        let meta = ENTRY_FIELDS.translate(meta);
        let query = FindQuery::new(ENTRY_LAYOUT)
            .with_criterion("Warehouse", exact(&self.warehouse))
            .with_criterion("Id_shipmentNumber", "=")
            .with_criterion("is_utilized", "=");

        let (records, response_meta) = list_records(self.store.as_ref(), query, &meta).await?;
        let entries = records
            .iter()
            .map(|r| BackendEntry::from_record(r).map(|e| e.to_domain()))
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok((entries, response_meta))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Entry, ServiceError> {
        let query = FindQuery::new(ENTRY_LAYOUT).with_criterion("id", exact(id));
        let record = single_record(self.store.as_ref(), query)
            .await
            .map_err(|err| match err {
                StoreError::NoRecordsMatch => ServiceError::NotFound(format!("entry {}", id)),
                other => other.into(),
            })?;
        Ok(BackendEntry::from_record(&record)?.to_domain())
    }

    /// Creates the entry in this warehouse, recording the API account as creator.
    #[instrument(skip(self, entry), fields(customer_code = %entry.customer_code))]
    pub async fn create(&self, mut entry: Entry) -> Result<Entry, ServiceError> {
        if entry.warehouse.is_empty() {
            entry.warehouse = self.warehouse.clone();
        }
        let fields = entry
            .field_values()
            .set("CreatedBy_Account", &self.account_name);

        let record = create_record(self.store.as_ref(), ENTRY_LAYOUT, &fields).await?;
        let created = BackendEntry::from_record(&record)?.to_domain();
        info!(id = %created.id, "entry created");
        Ok(created)
    }

    /// Replaces every writable field of entry `id` and writes the audit trail.
    #[instrument(skip(self, entry))]
    pub async fn update(&self, id: &str, mut entry: Entry) -> Result<Entry, ServiceError> {
        let current = self.get(id).await?;
        entry.id = current.id.clone();
        if entry.warehouse.is_empty() {
            entry.warehouse = current.warehouse;
        }

        let audit = AuditTrail {
            id: current.id,
            table: AUDIT_TABLE.to_string(),
            action: AUDIT_ACTION.to_string(),
            user: self.account_name.clone(),
        };
        let record = update_record(
            self.store.as_ref(),
            ENTRY_LAYOUT,
            current.record_id,
            &entry.field_values(),
            Some(&audit),
        )
        .await?;
        Ok(BackendEntry::from_record(&record)?.to_domain())
    }
}
