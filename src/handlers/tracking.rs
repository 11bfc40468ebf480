use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::ApiResult;
use crate::errors::ServiceError;
use crate::services::tracking::SourceResponse;
use crate::AppState;

/// Couriers that may have issued `track_code`, as answered by the courier service.
pub async fn source_by_track_code(
    State(state): State<AppState>,
    Path(track_code): Path<String>,
) -> ApiResult<Json<SourceResponse>> {
    let track_code = track_code.trim();
    if track_code.is_empty() {
        return Err(ServiceError::ValidationError("track code is empty".into())
            .into_api("Track code is required", "Scan or type the track code"));
    }

    let response = state
        .tracking
        .source_by_track(track_code)
        .await
        .map_err(|err| {
            err.into_api(
                "Failed to look up the courier",
                "Try again later or pick the courier manually",
            )
        })?;
    Ok(Json(response))
}

pub fn tracking_routes() -> Router<AppState> {
    Router::new().route("/source/:track_code", get(source_by_track_code))
}
