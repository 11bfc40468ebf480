use axum::{extract::State, routing::get, Router};

use super::{ApiResult, JsonResponse};
use crate::errors::DEFAULT_HINT;
use crate::models::Customer;
use crate::AppState;

/// Every customer code, served from the customer list cache.
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<JsonResponse<Vec<Customer>>> {
    let (customers, meta) = state
        .customers
        .list()
        .await
        .map_err(|err| err.into_api("Failed to fetch customers", DEFAULT_HINT))?;
    Ok(JsonResponse::new(meta, customers))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new().route("/", get(list_customers))
}
