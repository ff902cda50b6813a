//! Bititec API library
//!
//! Inventory consistency backend of an equipment dealer: stock counters,
//! the demand records that draw against them, and the workflow documents
//! (sales, leases, calls, deliveries) built on top.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    http::{header, Method},
    response::Json,
    routing::get,
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            config.numbering_max_attempts,
        );
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<T>, errors::ServiceError>;

/// Routes under `/api/v1`; every one of them needs a bearer token
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/stores", handlers::stores::store_routes())
        .nest("/clients", handlers::stores::client_routes())
        .nest("/client-machines", handlers::catalogs::client_machine_routes())
        .nest("/item-types", handlers::catalogs::item_type_routes())
        .nest("/parts", handlers::inventory::part_routes())
        .nest("/accessories", handlers::inventory::accessory_routes())
        .nest("/machines", handlers::inventory::machine_routes())
        .nest("/inventory", handlers::inventory::reconciliation_routes())
        .nest("/sales", handlers::sales::sale_routes())
        .nest("/sale-items", handlers::sales::sale_item_routes())
        .nest("/leases", handlers::leases::lease_routes())
        .nest("/meter-readings", handlers::leases::meter_reading_routes())
        .nest(
            "/lease-part-inquiries",
            handlers::leases::lease_part_inquiry_routes(),
        )
        .nest(
            "/lease-acc-inquiries",
            handlers::leases::lease_acc_inquiry_routes(),
        )
        .nest("/calls", handlers::calls::call_routes())
        .nest("/store-inquiries", handlers::calls::store_inquiry_routes())
        .nest("/deliveries", handlers::deliveries::delivery_routes())
        .with_auth()
}

/// Full application router with the HTTP layer stack applied
pub fn build_router(state: AppState) -> Router {
    let auth_service = Arc::new(AuthService::new(AuthConfig::new(
        state.config.jwt_secret.clone(),
    )));
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        .layer(Extension(auth_service))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
}
