use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::cache::{get_json, set_json, CacheBackend};
use crate::errors::ServiceError;
use crate::models::customer::{BackendCustomer, Customer};
use crate::queries::{RequestMeta, ResponseMeta, CUSTOMER_FIELDS};
use crate::store::{list_records, FindQuery, RecordStore, StoreError};

pub const CUSTOMER_LAYOUT: &str = "warehouse_customer_list";
pub const CUSTOMER_LIST_CACHE_KEY: &str = "customer_list";

/// Customer codes, served through a TTL cache.
#[derive(Clone)]
pub struct CustomerRepository {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl CustomerRepository {
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// Every customer. A cache failure falls back to the backend.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<(Vec<Customer>, ResponseMeta), ServiceError> {
        match get_json::<Vec<Customer>>(self.cache.as_ref(), CUSTOMER_LIST_CACHE_KEY).await {
            Ok(Some(customers)) => {
                debug!(count = customers.len(), "customer list served from cache");
                let meta = ResponseMeta::single_page(customers.len());
                return Ok((customers, meta));
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "customer cache read failed"),
        }

        let meta = CUSTOMER_FIELDS.translate(RequestMeta::default());
        let (records, response_meta) =
            list_records(self.store.as_ref(), FindQuery::new(CUSTOMER_LAYOUT), &meta).await?;
        let customers = records
            .iter()
            .map(|r| r.decode::<BackendCustomer>().map(|c| c.to_domain()))
            .collect::<Result<Vec<_>, StoreError>>()?;

        if let Err(err) =
            set_json(self.cache.as_ref(), CUSTOMER_LIST_CACHE_KEY, &customers, self.ttl).await
        {
            warn!(error = %err, "customer cache write failed");
        }
        Ok((customers, response_meta))
    }
}
