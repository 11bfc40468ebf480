use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    /// Printed-label ledger
    pub ledger: ComponentStatus,
    /// Open live-update sockets
    pub subscribers: usize,
}

/// Liveness plus a ping of the printed-label ledger.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ledger = match state.db.ping().await {
        Ok(()) => ComponentStatus::Up,
        Err(err) => {
            warn!(error = %err, "printed-label ledger ping failed");
            ComponentStatus::Down
        }
    };

    let status_code = match ledger {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    let body = HealthResponse {
        status: ledger,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        ledger,
        subscribers: state.broadcaster.subscriber_count(),
    };
    (status_code, Json(body))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
