use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;

use super::{request_meta, ApiResult, JsonResponse, PRINT_DONE};
use crate::errors::{ServiceError, DEFAULT_HINT};
use crate::models::Shipment;
use crate::printing::{Label, PrintJob};
use crate::AppState;

/// Print options of the unit-load label endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PrintParams {
    #[serde(default)]
    pub copies: Option<u32>,
    #[serde(default)]
    pub media: Option<String>,
}

async fn shipment_by_code(state: &AppState, code: &str) -> ApiResult<Shipment> {
    state.shipments.by_code(code).await.map_err(|err| match err.root() {
        ServiceError::NotFound(_) => err.into_api(
            format!("Shipment {} was not found", code),
            "Check the shipment code",
        ),
        _ => err.into_api("Failed to fetch shipment", DEFAULT_HINT),
    })
}

async fn print_label(state: &AppState, job: PrintJob, label: Label) -> ApiResult<()> {
    state
        .printer
        .print(job, vec![label])
        .await
        .map_err(|err| err.into_api("Failed to print label", "Check the printer"))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<JsonResponse<Vec<Shipment>>> {
    let meta = request_meta(&pairs, state.config.default_per_page)?;
    let (shipments, response_meta) = state
        .shipments
        .list(meta)
        .await
        .map_err(|err| err.into_api("Failed to fetch shipments", DEFAULT_HINT))?;
    Ok(JsonResponse::new(response_meta, shipments))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<JsonResponse<Shipment>> {
    let shipment = shipment_by_code(&state, &code).await?;
    Ok(JsonResponse::single(shipment))
}

pub async fn print_unit_load_labels(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<PrintParams>,
) -> ApiResult<&'static str> {
    let job = PrintJob::new(params.copies.unwrap_or(1), params.media.as_deref())?;
    let shipment = shipment_by_code(&state, &code).await?;
    let label = state
        .renderer
        .unit_load_labels(&shipment)
        .await
        .map_err(|err| err.into_api("Failed to render unit load labels", DEFAULT_HINT))?;

    print_label(&state, job, label).await?;
    info!(shipment = %code, unit_loads = shipment.unit_loads.len(), "unit load labels printed");
    Ok(PRINT_DONE)
}

pub async fn print_preparation_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<&'static str> {
    let shipment = shipment_by_code(&state, &code).await?;
    let label = state
        .renderer
        .preparation_label(&shipment)
        .await
        .map_err(|err| err.into_api("Failed to render preparation label", DEFAULT_HINT))?;

    print_label(&state, PrintJob::default(), label).await?;
    info!(shipment = %code, "preparation label printed");
    Ok(PRINT_DONE)
}

pub async fn print_partner_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<&'static str> {
    let shipment = shipment_by_code(&state, &code).await?;
    let label = state
        .renderer
        .partner_info_label(&shipment)
        .await
        .map_err(|err| err.into_api("Failed to render partner info label", DEFAULT_HINT))?;

    print_label(&state, PrintJob::default(), label).await?;
    info!(shipment = %code, "partner info label printed");
    Ok(PRINT_DONE)
}

pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shipments))
        .route("/:code", get(get_shipment))
        .route("/:code/print/unit_loads", post(print_unit_load_labels))
        .route("/:code/print/preparation_info", post(print_preparation_info))
        .route("/:code/print/partner_info", post(print_partner_info))
}
