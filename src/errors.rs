use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::models::shipment::ShipmentError;
use crate::store::StoreError;

/// Hint shown to the operator when nothing more specific is known.
pub const DEFAULT_HINT: &str = "Unknown cause, please contact the administrator";

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found")
    pub error: String,
    /// Short human-readable description
    pub message: String,
    /// What the operator can do about it
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

/// User-facing error envelope: a message and a hint for the operator, plus the
/// internal cause that is only ever logged.
#[derive(Debug, thiserror::Error)]
#[error("{message}. Internal error: {cause}")]
pub struct ApiError {
    pub message: String,
    pub hint: String,
    #[source]
    pub cause: Box<ServiceError>,
}

impl ApiError {
    pub fn new(cause: ServiceError, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: hint.into(),
            cause: Box::new(cause),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing idempotency key")]
    MissingIdempotencyKey,

    #[error("Duplicate request: {0}")]
    DuplicateRequest(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Backend inconsistency: {0}")]
    BackendInconsistency(String),

    #[error("Record store error: {0}")]
    Store(StoreError),

    #[error("Ledger database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Api(Box<ApiError>),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyResultSet { operation } => ServiceError::BackendInconsistency(
                format!("0 records in result set after {}", operation),
            ),
            StoreError::NoRecordsMatch => {
                ServiceError::NotFound("no records match the request".to_string())
            }
            other => ServiceError::Store(other),
        }
    }
}

impl From<ShipmentError> for ServiceError {
    fn from(err: ShipmentError) -> Self {
        match err {
            ShipmentError::InvalidTransition { .. } => {
                ServiceError::InvalidTransition(err.to_string())
            }
            ShipmentError::InvalidState { .. } => ServiceError::InvalidState(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<crate::cache::CacheError> for ServiceError {
    fn from(err: crate::cache::CacheError) -> Self {
        ServiceError::CacheError(err.to_string())
    }
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        ServiceError::Api(Box::new(err))
    }
}

impl ServiceError {
    /// Wraps this error into the user-facing envelope. An error that already carries
    /// an envelope is returned unchanged so the innermost message survives.
    pub fn into_api(self, message: impl Into<String>, hint: impl Into<String>) -> Self {
        match self {
            ServiceError::Api(_) => self,
            other => ServiceError::Api(Box::new(ApiError::new(other, message, hint))),
        }
    }

    /// Innermost error, looking through any envelope.
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::Api(api) => api.cause.root(),
            other => other,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::MissingIdempotencyKey => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateRequest(_) | Self::InvalidTransition(_) | Self::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            Self::Store(StoreError::Transport(_)) | Self::Store(StoreError::Backend { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::BackendInconsistency(_)
            | Self::Store(_)
            | Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::CacheError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Api(api) => api.cause.status_code(),
        }
    }

    /// Message suitable for the response body. Internal failures get a generic text.
    pub fn response_message(&self) -> String {
        match self {
            Self::Api(api) => api.message.clone(),
            Self::MissingIdempotencyKey => "Request id was not received".to_string(),
            Self::DuplicateRequest(_) => "Duplicate requests are not allowed".to_string(),
            Self::Store(_) => "Backend database error".to_string(),
            Self::BackendInconsistency(_)
            | Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::CacheError(_)
            | Self::InternalError(_) => "Internal server error".to_string(),
            Self::ExternalServiceError(_) => "External service error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn hint(&self) -> String {
        match self {
            Self::Api(api) => api.hint.clone(),
            Self::DuplicateRequest(_) => "Refresh the page and try again".to_string(),
            Self::ValidationError(_) => "Check the request parameters".to_string(),
            _ => DEFAULT_HINT.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            hint: self.hint(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
