#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use warehouse_bridge::{
    app_router,
    config::AppConfig,
    db,
    errors::ServiceError,
    migrator,
    printing::{Label, PrintJob, Printer, TextLabelRenderer},
    repositories::{entry_repository::ENTRY_LAYOUT, PrintedLabelRepository},
    services::tracking::{CourierTracking, Shipper, SourceResponse},
    store::MemoryStore,
    AppState,
};

/// Printer that remembers every submission instead of talking to a device.
#[derive(Clone, Default)]
pub struct RecordingPrinter {
    jobs: Arc<Mutex<Vec<(PrintJob, Vec<Label>)>>>,
}

impl RecordingPrinter {
    pub fn jobs(&self) -> Vec<(PrintJob, Vec<Label>)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Printer for RecordingPrinter {
    async fn print(&self, job: PrintJob, labels: Vec<Label>) -> Result<(), ServiceError> {
        self.jobs.lock().unwrap().push((job, labels));
        Ok(())
    }
}

/// Courier service answering every track code with one fixed courier.
pub struct StubTracking;

#[async_trait]
impl CourierTracking for StubTracking {
    async fn source_by_track(&self, track_code: &str) -> Result<SourceResponse, ServiceError> {
        Ok(SourceResponse {
            logistic_code: track_code.to_string(),
            shippers: vec![Shipper {
                name: "顺丰速运".into(),
                code: "SF".into(),
            }],
            business_id: "1000000".into(),
            code: "100".into(),
            success: true,
        })
    }
}

/// Application wired to an in-memory record store and ledger.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub printer: RecordingPrinter,
    pub ledger: PrintedLabelRepository,
    pub labels: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::for_tests()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new().with_serial_field(ENTRY_LAYOUT, "id");
        let pool = db::establish_connection("sqlite::memory:")
            .await
            .expect("in-memory ledger");
        migrator::run_migrations(&pool)
            .await
            .expect("ledger migrations");
        let db = Arc::new(pool);

        let labels = TempDir::new().expect("label dir");
        let printer = RecordingPrinter::default();

        let state = AppState::new(
            config,
            Arc::new(store.clone()),
            db.clone(),
            Arc::new(TextLabelRenderer::new(labels.path())),
            Arc::new(printer.clone()),
            Arc::new(StubTracking),
        );

        Self {
            router: app_router(state.clone()),
            state,
            store,
            printer,
            ledger: PrintedLabelRepository::new(db),
            labels,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, &[]).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 response")
}
