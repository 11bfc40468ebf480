use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use validator::Validate;

use super::{request_meta, ApiResult, JsonResponse, PRINT_DONE};
use crate::errors::{ServiceError, DEFAULT_HINT};
use crate::middleware_helpers::idempotency::duplicate_request_middleware;
use crate::models::Entry;
use crate::printing::PrintJob;
use crate::AppState;

fn not_found_or(err: ServiceError, id: &str, message: &str) -> ServiceError {
    match err.root() {
        ServiceError::NotFound(_) => {
            err.into_api(format!("Entry {} was not found", id), "Check the entry id")
        }
        _ => err.into_api(message, DEFAULT_HINT),
    }
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<JsonResponse<Vec<Entry>>> {
    let meta = request_meta(&pairs, state.config.default_per_page)?;
    let (entries, response_meta) = state
        .entries
        .list(meta)
        .await
        .map_err(|err| err.into_api("Failed to fetch entries", DEFAULT_HINT))?;
    Ok(JsonResponse::new(response_meta, entries))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<JsonResponse<Entry>> {
    let entry = state
        .entries
        .get(&id)
        .await
        .map_err(|err| not_found_or(err, &id, "Failed to fetch entry"))?;
    Ok(JsonResponse::single(entry))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<Entry>,
) -> ApiResult<(StatusCode, Json<Entry>)> {
    payload.validate().map_err(|err| {
        ServiceError::from(err).into_api("Entry is not valid", "Check the entry fields")
    })?;

    let entry = state
        .entries
        .create(payload)
        .await
        .map_err(|err| err.into_api("Failed to create entry", DEFAULT_HINT))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Entry>,
) -> ApiResult<Json<Entry>> {
    payload.validate().map_err(|err| {
        ServiceError::from(err).into_api("Entry is not valid", "Check the entry fields")
    })?;

    let entry = state
        .entries
        .update(&id, payload)
        .await
        .map_err(|err| not_found_or(err, &id, "Failed to update entry"))?;
    Ok(Json(entry))
}

pub async fn print_entry_barcode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    let label = state
        .renderer
        .entry_barcode(&id)
        .await
        .map_err(|err| err.into_api("Failed to render entry barcode", DEFAULT_HINT))?;

    state
        .printer
        .print(PrintJob::default(), vec![label])
        .await
        .map_err(|err| err.into_api("Failed to print entry barcode", "Check the printer"))?;

    info!(entry_id = %id, "entry barcode printed");
    Ok(PRINT_DONE)
}

/// Entry routes. Only creation is guarded against duplicate submissions.
pub fn entry_routes(state: &AppState) -> Router<AppState> {
    let guarded_create = post(create_entry).layer(middleware::from_fn_with_state(
        state.request_guard.clone(),
        duplicate_request_middleware,
    ));

    Router::new()
        .route("/", get(list_entries).merge(guarded_create))
        .route("/:id", get(get_entry).put(update_entry))
        .route("/:id/print_barcode", post(print_entry_barcode))
}
