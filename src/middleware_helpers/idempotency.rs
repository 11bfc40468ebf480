use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Header carrying the client-supplied idempotency token.
pub const API_REQUEST_ID_HEADER: &str = "x-api-request-id";

/// Short-TTL set of idempotency tokens seen on creating requests.
#[derive(Clone)]
pub struct DuplicateRequestGuard {
    tokens: Arc<DashMap<String, Instant>>,
    ttl: Duration,
}

impl DuplicateRequestGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Records `token`, failing if it is missing or was recorded within the TTL.
    pub fn acquire(&self, token: Option<&str>) -> Result<(), ServiceError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::MissingIdempotencyKey)?;

        match self.tokens.entry(token.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().elapsed() < self.ttl {
                    metrics::counter!("idempotency.rejected", 1);
                    return Err(ServiceError::DuplicateRequest(token.to_string()));
                }
                occupied.insert(Instant::now());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
            }
        }
        Ok(())
    }

    /// Forgets `token` so a retry carrying it is accepted.
    pub fn release(&self, token: &str) {
        self.tokens.remove(token.trim());
    }

    pub fn cleanup(&self) {
        let ttl = self.ttl;
        self.tokens.retain(|_, seen| seen.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Guards creating requests. The token is released again when the handler
/// answers with anything other than a 2xx status.
pub async fn duplicate_request_middleware(
    State(guard): State<DuplicateRequestGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    guard.cleanup();

    let token = request
        .headers()
        .get(API_REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    guard.acquire(token.as_deref()).map_err(|err| {
        warn!(error = %err, "creating request rejected by duplicate guard");
        err
    })?;

    let response = next.run(request).await;

    if !response.status().is_success() {
        if let Some(token) = token.as_deref() {
            debug!(token, status = response.status().as_u16(), "releasing idempotency token");
            guard.release(token);
        }
    }

    Ok(response)
}
