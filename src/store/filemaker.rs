use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::{FieldValues, FindQuery, Record, RecordSet, RecordStore, ScriptCall, StoreError};
use crate::config::BackendConfig;

/// Backend error code for "No records match the request".
pub const NO_RECORDS_MATCH: &str = "401";
/// Backend error code for an invalid or expired session token.
const INVALID_TOKEN: &str = "952";
const RECORD_MISSING: &str = "101";
/// Page size used when every matching record is requested; the backend
/// defaults to 100 records when no limit is sent.
const FIND_PAGE_SIZE: i64 = 500;
/// Rows requested per portal; the backend defaults to 50.
const PORTAL_ROW_LIMIT: i64 = 1000;

/// [`RecordStore`] over the backend's JSON data API.
pub struct FileMakerStore {
    client: Client,
    base_url: Url,
    database: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Value,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct DataInfo {
    #[serde(rename = "foundCount", default)]
    found_count: i64,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "recordId")]
    record_id: Value,
    #[serde(rename = "fieldData", default)]
    field_data: Map<String, Value>,
    #[serde(rename = "portalData", default)]
    portal_data: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct DataResponse {
    #[serde(rename = "dataInfo", default)]
    data_info: DataInfo,
    #[serde(default)]
    data: Vec<RawRecord>,
}

impl FileMakerStore {
    pub fn new(config: &BackendConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidQuery(format!("backend url: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidQuery("backend url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["databases", self.database.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn layout_url(&self, layout: &str, rest: &[&str]) -> Result<Url, StoreError> {
        let mut segments = vec!["layouts", layout];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    #[instrument(skip(self))]
    async fn login(&self) -> Result<String, StoreError> {
        let url = self.url(&["sessions"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({}))
            .send()
            .await?;

        let envelope = read_envelope(response).await?;
        let token = envelope
            .response
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode("session response without token".into()))?;

        info!(database = %self.database, "backend session opened");
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn session_token(&self) -> Result<String, StoreError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    /// Sends a request, logging in again once when the session has expired.
    async fn send<F>(&self, build: F) -> Result<Envelope, StoreError>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.session_token().await?;
        match read_envelope(build(&token).send().await?).await {
            Err(StoreError::Backend { code, .. }) if code == INVALID_TOKEN => {
                warn!("backend session expired, logging in again");
                *self.token.write().await = None;
                let token = self.login().await?;
                read_envelope(build(&token).send().await?).await
            }
            other => other,
        }
    }

    async fn get_record(&self, layout: &str, record_id: i64) -> Result<RecordSet, StoreError> {
        let id = record_id.to_string();
        let url = self.layout_url(layout, &["records", id.as_str()])?;
        match self
            .send(|token| self.client.get(url.clone()).bearer_auth(token))
            .await
        {
            Ok(envelope) => record_set(envelope),
            Err(StoreError::NoRecordsMatch) => Ok(RecordSet::default()),
            Err(StoreError::Backend { code, .. }) if code == RECORD_MISSING => {
                Ok(RecordSet::default())
            }
            Err(err) => Err(err),
        }
    }

    async fn find_page(
        &self,
        query: &FindQuery,
        skip: i64,
        limit: i64,
    ) -> Result<RecordSet, StoreError> {
        let envelope = if query.has_criteria() {
            let url = self.layout_url(&query.layout, &["_find"])?;
            let body = find_body(query, skip, limit);
            debug!(%body, "backend find");
            self.send(|token| {
                self.client
                    .request(Method::POST, url.clone())
                    .bearer_auth(token)
                    .json(&body)
            })
            .await?
        } else {
            let mut url = self.layout_url(&query.layout, &["records"])?;
            {
                let mut params = url.query_pairs_mut();
                params.append_pair("_offset", &(skip + 1).to_string());
                params.append_pair("_limit", &limit.to_string());
                if !query.sort.is_empty() {
                    params.append_pair("_sort", &sort_json(query).to_string());
                }
                if !query.portals.is_empty() {
                    params.append_pair("portal", &Value::from(query.portals.clone()).to_string());
                    let row_limit = PORTAL_ROW_LIMIT.to_string();
                    for portal in &query.portals {
                        params.append_pair(&format!("_limit.{}", portal), &row_limit);
                    }
                }
            }
            self.send(|token| self.client.get(url.clone()).bearer_auth(token))
                .await?
        };

        record_set(envelope)
    }
}

#[async_trait]
impl RecordStore for FileMakerStore {
    /// Without a limit every matching record is fetched, one page at a time.
    #[instrument(skip(self, query), fields(layout = %query.layout))]
    async fn find(&self, query: &FindQuery) -> Result<RecordSet, StoreError> {
        if let Some(limit) = query.limit {
            return self.find_page(query, query.skip, limit).await;
        }

        let mut set = self.find_page(query, query.skip, FIND_PAGE_SIZE).await?;
        let mut pages = 1;
        while query.skip + (set.records.len() as i64) < set.found_count {
            let offset = query.skip + set.records.len() as i64;
            match self.find_page(query, offset, FIND_PAGE_SIZE).await {
                Ok(next) if !next.records.is_empty() => {
                    set.records.extend(next.records);
                    pages += 1;
                }
                Ok(_) | Err(StoreError::NoRecordsMatch) => break,
                Err(err) => return Err(err),
            }
        }
        debug!(records = set.records.len(), found = set.found_count, pages, "fetched all records");
        Ok(set)
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, layout: &str, fields: &FieldValues) -> Result<RecordSet, StoreError> {
        let url = self.layout_url(layout, &["records"])?;
        let body = json!({ "fieldData": fields.to_json() });
        let envelope = self
            .send(|token| self.client.post(url.clone()).bearer_auth(token).json(&body))
            .await?;

        let record_id = envelope
            .response
            .get("recordId")
            .and_then(parse_record_id)
            .ok_or_else(|| StoreError::Decode("create response without recordId".into()))?;

        self.get_record(layout, record_id).await
    }

    #[instrument(skip(self, fields, script))]
    async fn update(
        &self,
        layout: &str,
        record_id: i64,
        fields: &FieldValues,
        script: Option<&ScriptCall>,
    ) -> Result<RecordSet, StoreError> {
        let id = record_id.to_string();
        let url = self.layout_url(layout, &["records", id.as_str()])?;
        let mut body = json!({ "fieldData": fields.to_json() });
        if let Some(call) = script {
            body["script"] = Value::String(call.name.clone());
            body["script.param"] = Value::String(call.param.clone());
        }

        let envelope = self
            .send(|token| {
                self.client
                    .request(Method::PATCH, url.clone())
                    .bearer_auth(token)
                    .json(&body)
            })
            .await?;
        let script_error = envelope
            .response
            .get("scriptError")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        let mut set = self.get_record(layout, record_id).await?;
        set.script_error = script_error;
        Ok(set)
    }
}

async fn read_envelope(response: reqwest::Response) -> Result<Envelope, StoreError> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: Envelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(_) if status == StatusCode::UNAUTHORIZED => {
            return Err(StoreError::Backend {
                code: INVALID_TOKEN.into(),
                message: "unauthorized".into(),
            })
        }
        Err(e) => {
            return Err(StoreError::Transport(format!(
                "unexpected backend response ({}): {}",
                status, e
            )))
        }
    };

    match envelope.messages.iter().find(|m| m.code != "0") {
        Some(m) if m.code == NO_RECORDS_MATCH => Err(StoreError::NoRecordsMatch),
        Some(m) => Err(StoreError::Backend {
            code: m.code.clone(),
            message: m.message.clone(),
        }),
        None => Ok(envelope),
    }
}

fn sort_json(query: &FindQuery) -> Value {
    Value::Array(
        query
            .sort
            .iter()
            .map(|s| {
                json!({
                    "fieldName": s.name,
                    "sortOrder": if s.descending { "descend" } else { "ascend" },
                })
            })
            .collect(),
    )
}

fn find_body(query: &FindQuery, skip: i64, limit: i64) -> Value {
    let request: Map<String, Value> = query
        .criteria
        .iter()
        .map(|(field, value)| (field.clone(), Value::String(value.clone())))
        .collect();

    let mut body = json!({
        "query": [request],
        "offset": skip + 1,
        "limit": limit,
    });
    if !query.sort.is_empty() {
        body["sort"] = sort_json(query);
    }
    if !query.portals.is_empty() {
        body["portal"] = Value::from(query.portals.clone());
        for portal in &query.portals {
            body[format!("limit.{}", portal)] = json!(PORTAL_ROW_LIMIT);
        }
    }
    body
}

fn parse_record_id(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn record_set(envelope: Envelope) -> Result<RecordSet, StoreError> {
    let data: DataResponse = serde_json::from_value(envelope.response)
        .map_err(|e| StoreError::Decode(format!("data response: {}", e)))?;

    let records = data
        .data
        .into_iter()
        .map(into_record)
        .collect::<Result<Vec<_>, _>>()?;
    let found_count = data.data_info.found_count.max(records.len() as i64);

    Ok(RecordSet {
        records,
        found_count,
        script_error: None,
    })
}

/// Flattens portal rows into the field map: every portal becomes an array of
/// row objects with the table occurrence prefix stripped from field names.
fn into_record(raw: RawRecord) -> Result<Record, StoreError> {
    let record_id = parse_record_id(&raw.record_id)
        .ok_or_else(|| StoreError::Decode(format!("invalid recordId {}", raw.record_id)))?;

    let mut fields = raw.field_data;
    for (portal, rows) in raw.portal_data {
        let rows = match rows {
            Value::Array(rows) => rows,
            _ => continue,
        };
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(row) => Some(Value::Object(
                    row.into_iter()
                        .map(|(k, v)| match k.split_once("::") {
                            Some((_, field)) => (field.to_string(), v),
                            None => (k, v),
                        })
                        .collect(),
                )),
                _ => None,
            })
            .collect();
        fields.insert(portal, Value::Array(rows));
    }

    Ok(Record::new(record_id, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::SortField;
    use crate::models::shipment::TransferPoints;
    use crate::repositories::ShipmentRepository;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const BASE: &str = "/fmi/data/vLatest/databases/warehouse";

    fn store(server: &MockServer) -> FileMakerStore {
        FileMakerStore::new(&BackendConfig {
            url: format!("{}/fmi/data/vLatest/", server.uri()),
            database: "warehouse".into(),
            username: "api".into(),
            password: "secret".into(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    fn ok(response: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "response": response,
            "messages": [{"code": "0", "message": "OK"}]
        }))
    }

    fn fault(status: u16, code: &str, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(status).set_body_json(json!({
            "response": {},
            "messages": [{"code": code, "message": message}]
        }))
    }

    async fn mount_login(server: &MockServer, token: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("{}/sessions", BASE)))
            .respond_with(ok(json!({ "token": token })))
            .up_to_n_times(times)
            .mount(server)
            .await;
    }

    #[test]
    fn find_body_uses_one_based_offset() {
        let query = FindQuery {
            layout: "warehouse_entry_single".into(),
            criteria: vec![("Warehouse".into(), "=GZWH2".into())],
            sort: vec![SortField::desc("Date_Created_Timestamp")],
            skip: 20,
            limit: Some(10),
            portals: Vec::new(),
        };
        let body = find_body(&query, 20, 10);
        assert_eq!(body["offset"], json!(21));
        assert_eq!(body["limit"], json!(10));
        assert_eq!(body["query"][0]["Warehouse"], json!("=GZWH2"));
        assert_eq!(body["sort"][0]["sortOrder"], json!("descend"));
    }

    #[test]
    fn find_body_always_sends_limits() {
        let query = FindQuery::new("l")
            .with_criterion("a", "1")
            .with_portals(&["TO2b_Shipments||ShipmentDetails"]);
        let body = find_body(&query, 0, FIND_PAGE_SIZE);
        assert_eq!(body["limit"], json!(FIND_PAGE_SIZE));
        assert_eq!(body["portal"], json!(["TO2b_Shipments||ShipmentDetails"]));
        assert_eq!(
            body["limit.TO2b_Shipments||ShipmentDetails"],
            json!(PORTAL_ROW_LIMIT)
        );
    }

    #[test]
    fn portal_rows_are_merged_without_prefix() {
        let raw: RawRecord = serde_json::from_value(json!({
            "recordId": "12",
            "fieldData": {"code": "SPN1"},
            "portalData": {
                "TO2b_Shipments||ShipmentDetails": [
                    {"recordId": "3", "TO2b_Shipments||ShipmentDetails::SD_Weight": 10}
                ]
            }
        }))
        .unwrap();

        let record = into_record(raw).unwrap();
        assert_eq!(record.record_id, 12);
        assert_eq!(
            record.fields["TO2b_Shipments||ShipmentDetails"][0]["SD_Weight"],
            json!(10)
        );
    }

    #[tokio::test]
    async fn find_logs_in_once_and_posts_the_query() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/layouts/warehouse_entry_single/_find", BASE)))
            .and(header("authorization", "Bearer T1"))
            .and(body_partial_json(
                json!({"query": [{"Warehouse": "=GZWH2"}], "offset": 1, "limit": 20}),
            ))
            .respond_with(ok(json!({
                "dataInfo": {"foundCount": 7},
                "data": [{"recordId": "5", "fieldData": {"id": "E5"}, "portalData": {}}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let store = store(&server);
        let query = FindQuery {
            limit: Some(20),
            ..FindQuery::new("warehouse_entry_single").with_criterion("Warehouse", "=GZWH2")
        };
        let set = store.find(&query).await.unwrap();
        assert_eq!(set.found_count, 7);
        assert_eq!(set.records[0].fields["id"], json!("E5"));

        // the session is reused
        store.find(&query).await.unwrap();
    }

    #[tokio::test]
    async fn no_match_code_becomes_sentinel() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/layouts/shipments/_find", BASE)))
            .respond_with(fault(500, NO_RECORDS_MATCH, "No records match the request"))
            .mount(&server)
            .await;

        let err = store(&server)
            .find(&FindQuery::new("shipments").with_criterion("code", "==NOPE"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoRecordsMatch));
    }

    #[tokio::test]
    async fn expired_session_is_renewed_once() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        mount_login(&server, "T2", 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/layouts/customers/records", BASE)))
            .and(header("authorization", "Bearer T1"))
            .respond_with(fault(401, INVALID_TOKEN, "Invalid FileMaker Data API token"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/layouts/customers/records", BASE)))
            .and(header("authorization", "Bearer T2"))
            .respond_with(ok(json!({
                "dataInfo": {"foundCount": 1},
                "data": [{"recordId": 1, "fieldData": {"CustomerCode": "CON"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let set = store(&server).find(&FindQuery::new("customers")).await.unwrap();
        assert_eq!(set.records[0].fields["CustomerCode"], json!("CON"));
    }

    #[tokio::test]
    async fn create_reads_back_the_stored_record() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/layouts/entries/records", BASE)))
            .and(body_partial_json(json!({"fieldData": {"CustomerCode": "CON"}})))
            .respond_with(ok(json!({"recordId": "42", "modId": "0"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/layouts/entries/records/42", BASE)))
            .respond_with(ok(json!({
                "dataInfo": {"foundCount": 1},
                "data": [{"recordId": "42", "fieldData": {"id": "E42", "CustomerCode": "CON"}}]
            })))
            .mount(&server)
            .await;

        let set = store(&server)
            .create("entries", &FieldValues::new().set("CustomerCode", "CON"))
            .await
            .unwrap();
        assert_eq!(set.records[0].record_id, 42);
        assert_eq!(set.records[0].fields["id"], json!("E42"));
    }

    #[tokio::test]
    async fn update_reports_script_error() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/layouts/entries/records/7", BASE)))
            .and(body_partial_json(json!({"script": "api_audit_log"})))
            .respond_with(ok(json!({"modId": "3", "scriptError": "104"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/layouts/entries/records/7", BASE)))
            .respond_with(ok(json!({
                "data": [{"recordId": "7", "fieldData": {"id": "7"}}]
            })))
            .mount(&server)
            .await;

        let call = ScriptCall {
            name: "api_audit_log".into(),
            param: "7|Entries|api_edit_record||api".into(),
        };
        let set = store(&server)
            .update("entries", 7, &FieldValues::new().set("ProductName", "shoes"), Some(&call))
            .await
            .unwrap();
        assert_eq!(set.script_error.as_deref(), Some("104"));
        assert_eq!(set.records.len(), 1);
    }

    /// Serves `total` shipments, never more than 100 per request, honouring
    /// the offset and limit of both `_find` bodies and `GET records` queries.
    struct PagedShipments {
        total: i64,
    }

    impl Respond for PagedShipments {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let (offset, limit) = if request.body.is_empty() {
                let param = |name: &str| {
                    request
                        .url
                        .query_pairs()
                        .find(|(k, _)| k == name)
                        .and_then(|(_, v)| v.parse::<i64>().ok())
                };
                (param("_offset").unwrap_or(1), param("_limit").unwrap_or(100))
            } else {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                (
                    body["offset"].as_i64().unwrap_or(1),
                    body["limit"].as_i64().unwrap_or(100),
                )
            };

            let first = offset - 1;
            let last = (first + limit.min(100)).min(self.total);
            let data: Vec<Value> = (first..last)
                .map(|i| {
                    json!({
                        "recordId": (i + 1).to_string(),
                        "fieldData": {
                            "code": format!("SPN{}", i + 1),
                            "Departure_Warehouse": "GZWH2",
                            "has_unsent_update": 1
                        },
                        "portalData": {}
                    })
                })
                .collect();
            ok(json!({"dataInfo": {"foundCount": self.total}, "data": data}))
        }
    }

    #[tokio::test]
    async fn all_records_are_fetched_page_by_page() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/layouts/warehouse_shipment_single/_find", BASE)))
            .respond_with(PagedShipments { total: 250 })
            .mount(&server)
            .await;

        let shipments = ShipmentRepository::new(
            Arc::new(store(&server)),
            "GZWH2",
            TransferPoints::default(),
        );
        let pending = shipments.pending_updates().await.unwrap();
        assert_eq!(pending.len(), 250);
        assert_eq!(pending[0].code, "SPN1");
        assert_eq!(pending[249].code, "SPN250");

        let finds: Vec<Value> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().ends_with("/_find"))
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        assert_eq!(finds.len(), 3);
        assert!(finds.iter().all(|b| b["limit"] == json!(FIND_PAGE_SIZE)));
        assert_eq!(finds[1]["offset"], json!(101));
        assert_eq!(
            finds[0]["limit.TO2b_Shipments||ShipmentDetails"],
            json!(PORTAL_ROW_LIMIT)
        );
    }

    #[tokio::test]
    async fn find_all_without_criteria_pages_through_records() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/layouts/customers/records", BASE)))
            .respond_with(PagedShipments { total: 130 })
            .expect(2)
            .mount(&server)
            .await;

        let set = store(&server).find(&FindQuery::new("customers")).await.unwrap();
        assert_eq!(set.records.len(), 130);
        assert_eq!(set.found_count, 130);
    }

    #[tokio::test]
    async fn explicit_limit_fetches_one_page() {
        let server = MockServer::start().await;
        mount_login(&server, "T1", 1).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/layouts/shipments/_find", BASE)))
            .and(body_partial_json(json!({"offset": 21, "limit": 20})))
            .respond_with(PagedShipments { total: 250 })
            .expect(1)
            .mount(&server)
            .await;

        let query = FindQuery {
            skip: 20,
            limit: Some(20),
            ..FindQuery::new("shipments").with_criterion("code", "*")
        };
        let set = store(&server).find(&query).await.unwrap();
        assert_eq!(set.records.len(), 20);
        assert_eq!(set.found_count, 250);
    }
}
