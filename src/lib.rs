//! Warehouse Bridge
//!
//! HTTP bridge between warehouse clients and the backend record store: entry and
//! shipment records, label printing and live shipment updates.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod printing;
pub mod queries;
pub mod repositories;
pub mod services;
pub mod store;
pub mod tracing;

use axum::{http::HeaderValue, routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};

use crate::cache::{CacheBackend, InMemoryCache};
use crate::config::AppConfig;
use crate::events::ShipmentBroadcaster;
use crate::middleware_helpers::{idempotency::DuplicateRequestGuard, request_id::request_id_middleware};
use crate::models::TransferPoints;
use crate::printing::{LabelRenderer, Printer};
use crate::repositories::{CustomerRepository, EntryRepository, ShipmentRepository};
use crate::services::tracking::CourierTracking;
use crate::store::RecordStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Printed-label ledger
    pub db: Arc<DatabaseConnection>,
    pub entries: EntryRepository,
    pub shipments: ShipmentRepository,
    pub customers: CustomerRepository,
    pub renderer: Arc<dyn LabelRenderer>,
    pub printer: Arc<dyn Printer>,
    pub tracking: Arc<dyn CourierTracking>,
    pub broadcaster: ShipmentBroadcaster,
    pub request_guard: DuplicateRequestGuard,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RecordStore>,
        db: Arc<DatabaseConnection>,
        renderer: Arc<dyn LabelRenderer>,
        printer: Arc<dyn Printer>,
        tracking: Arc<dyn CourierTracking>,
    ) -> Self {
        let customer_cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());

        Self {
            entries: EntryRepository::new(
                store.clone(),
                &config.warehouse_code,
                &config.account_name,
            ),
            shipments: ShipmentRepository::new(
                store.clone(),
                &config.warehouse_code,
                TransferPoints::from_config(&config.transfer_points),
            ),
            customers: CustomerRepository::new(store, customer_cache, config.customer_cache_ttl()),
            request_guard: DuplicateRequestGuard::new(config.idempotency_ttl()),
            broadcaster: ShipmentBroadcaster::default(),
            config: Arc::new(config),
            db,
            renderer,
            printer,
            tracking,
            started_at: Instant::now(),
        }
    }
}

/// Explicit origins when configured, permissive in development and
/// same-origin only otherwise.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        ::tracing::info!("Using permissive CORS in the development environment");
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// Full application router with request id, HTTP tracing, compression and CORS layers.
pub fn app_router(state: AppState) -> Router {
    use handlers::{customers, entries, health, shipments, tracking, ws};

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(|| async { "warehouse-bridge up" }))
        .merge(health::health_routes())
        .nest("/api/entries", entries::entry_routes(&state))
        .nest("/api/shipments", shipments::shipment_routes())
        .nest("/api/customers", customers::customer_routes())
        .nest("/api/tracking", tracking::tracking_routes())
        .nest("/ws", ws::ws_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
