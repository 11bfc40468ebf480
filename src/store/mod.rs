//! Record store seam: the backend database is reached only through [`RecordStore`].
//!
//! The helpers in this module carry the list/single/create/update conventions
//! every repository shares:
//! - a list that matches nothing is an empty page, not an error;
//! - a single lookup that matches nothing is [`StoreError::NoRecordsMatch`];
//! - a create or update acknowledged without a record is
//!   [`StoreError::EmptyResultSet`].

pub mod fields;
pub mod filemaker;
pub mod memory;

pub use filemaker::FileMakerStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::queries::{RequestMeta, ResponseMeta, SortField};

/// Script run after an edit to write the audit trail.
pub const AUDIT_SCRIPT: &str = "api_audit_log";
const AUDIT_DELIMITER: &str = "|";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no records match the request")]
    NoRecordsMatch,

    #[error("backend transport error: {0}")]
    Transport(String),

    #[error("backend error {code}: {message}")]
    Backend { code: String, message: String },

    #[error("failed to decode backend record: {0}")]
    Decode(String),

    #[error("0 records in result set after {operation}")]
    EmptyResultSet { operation: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

/// One backend record. Portal rows are merged into `fields` under the portal name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub record_id: i64,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(record_id: i64, fields: Map<String, Value>) -> Self {
        Self { record_id, fields }
    }

    /// Decodes the field map into a backend-shaped struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| StoreError::Decode(format!("record {}: {}", self.record_id, e)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub records: Vec<Record>,
    /// Records matching the query, ignoring skip and limit
    pub found_count: i64,
    /// Error code reported by a script attached to the request, if any
    pub script_error: Option<String>,
}

/// Find request against one layout. Empty `criteria` finds every record.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub layout: String,
    pub criteria: Vec<(String, String)>,
    pub sort: Vec<SortField>,
    pub skip: i64,
    pub limit: Option<i64>,
    /// Related-record portals the caller reads in full
    pub portals: Vec<String>,
}

impl FindQuery {
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            ..Default::default()
        }
    }

    /// Adds a criterion unless one for the same field is already present.
    pub fn with_criterion(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        if !self.criteria.iter().any(|(f, _)| *f == field) {
            self.criteria.push((field, value.into()));
        }
        self
    }

    pub fn with_portals(mut self, portals: &[&str]) -> Self {
        self.portals.extend(portals.iter().map(|p| p.to_string()));
        self
    }

    pub fn has_criteria(&self) -> bool {
        !self.criteria.is_empty()
    }
}

/// Ordered field values sent on create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(Vec<(String, String)>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((name.into(), value.to_string()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect()
    }

    /// `[Name:Value]` pairs in submission order.
    pub fn audit_data(&self) -> String {
        self.0
            .iter()
            .map(|(n, v)| format!("[{}:{}]", n, v))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCall {
    pub name: String,
    pub param: String,
}

/// Who changed which record, attached to an update as a script call.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    pub id: String,
    pub table: String,
    pub action: String,
    pub user: String,
}

impl AuditTrail {
    pub fn script_call(&self, data: &str) -> ScriptCall {
        ScriptCall {
            name: AUDIT_SCRIPT.to_string(),
            param: [
                self.id.as_str(),
                self.table.as_str(),
                self.action.as_str(),
                data,
                self.user.as_str(),
            ]
            .join(AUDIT_DELIMITER),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Runs a find. A query matching nothing fails with [`StoreError::NoRecordsMatch`].
    async fn find(&self, query: &FindQuery) -> Result<RecordSet, StoreError>;

    /// Creates a record and returns it as stored by the backend.
    async fn create(&self, layout: &str, fields: &FieldValues) -> Result<RecordSet, StoreError>;

    /// Replaces the given fields of `record_id`, running `script` afterwards.
    async fn update(
        &self,
        layout: &str,
        record_id: i64,
        fields: &FieldValues,
        script: Option<&ScriptCall>,
    ) -> Result<RecordSet, StoreError>;
}

/// Runs a paged list query. Client filters are added after the pinned criteria
/// already present on `query` and never override them.
pub async fn list_records(
    store: &dyn RecordStore,
    mut query: FindQuery,
    meta: &RequestMeta,
) -> Result<(Vec<Record>, ResponseMeta), StoreError> {
    let meta = meta.clone().check();

    for field in &meta.sort {
        if field.name.trim().is_empty() {
            continue;
        }
        query.sort.push(field.clone());
    }
    for filter in &meta.filters {
        query = query.with_criterion(filter.key.clone(), filter.value.clone());
    }
    query.skip = meta.skip();
    query.limit = meta.limit();

    let mut response_meta = ResponseMeta::empty(meta.page);

    match store.find(&query).await {
        Ok(set) => {
            response_meta.count = set.records.len() as i64;
            response_meta.total = set.found_count.max(response_meta.count);
            Ok((set.records, response_meta))
        }
        Err(StoreError::NoRecordsMatch) => {
            debug!(layout = %query.layout, "no records match the list query");
            Ok((Vec::new(), response_meta))
        }
        Err(err) => Err(err),
    }
}

/// Fetches exactly one record.
pub async fn single_record(store: &dyn RecordStore, mut query: FindQuery) -> Result<Record, StoreError> {
    query.skip = 0;
    query.limit = Some(1);

    let set = store.find(&query).await?;
    set.records
        .into_iter()
        .next()
        .ok_or(StoreError::NoRecordsMatch)
}

pub async fn create_record(
    store: &dyn RecordStore,
    layout: &str,
    fields: &FieldValues,
) -> Result<Record, StoreError> {
    let set = store.create(layout, fields).await?;
    first_or_inconsistent(set, format!("create on {}", layout))
}

/// Full-record update. A failing audit script is logged and does not fail the update.
pub async fn update_record(
    store: &dyn RecordStore,
    layout: &str,
    record_id: i64,
    fields: &FieldValues,
    audit: Option<&AuditTrail>,
) -> Result<Record, StoreError> {
    let script = audit.map(|trail| trail.script_call(&fields.audit_data()));
    let set = store
        .update(layout, record_id, fields, script.as_ref())
        .await?;

    if let Some(code) = set.script_error.as_deref().filter(|c| *c != "0") {
        warn!(
            layout,
            record_id,
            script_error = code,
            "audit script failed after update"
        );
    }

    first_or_inconsistent(set, format!("update on {}", layout))
}

fn first_or_inconsistent(set: RecordSet, operation: String) -> Result<Record, StoreError> {
    match set.records.into_iter().next() {
        Some(record) => Ok(record),
        None => {
            error!(%operation, "backend acknowledged the write but returned no record");
            Err(StoreError::EmptyResultSet { operation })
        }
    }
}
