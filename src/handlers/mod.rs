//! HTTP surface: entries, shipments, customers, courier lookup, print
//! triggers and the live shipment socket.

pub mod customers;
pub mod entries;
pub mod health;
pub mod shipments;
pub mod tracking;
pub mod ws;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::ServiceError;
use crate::queries::{RequestMeta, ResponseMeta};

pub type ApiResult<T> = Result<T, ServiceError>;

/// Body printed by print triggers once the printer accepted the job.
pub const PRINT_DONE: &str = "done";

/// Envelope of every list and single-record response.
#[derive(Debug, Serialize)]
pub struct JsonResponse<T> {
    pub meta: ResponseMeta,
    pub data: T,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn new(meta: ResponseMeta, data: T) -> Self {
        Self { meta, data }
    }

    /// A single record.
    pub fn single(data: T) -> Self {
        Self::new(ResponseMeta::single_page(1), data)
    }
}

impl<T: Serialize> IntoResponse for JsonResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Pagination, sorting and filtering parsed from the raw query string.
pub fn request_meta(
    pairs: &[(String, String)],
    default_per_page: i64,
) -> ApiResult<RequestMeta> {
    RequestMeta::from_query_pairs(pairs, default_per_page).map_err(|err| {
        err.into_api(
            "Invalid pagination parameters",
            "Check page, per_page, sort and filter values",
        )
    })
}
