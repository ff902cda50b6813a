use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::services::stock_ledger::StockLevel;

/// Upper bound on `per_page`
const MAX_PER_PAGE: u64 = 100;

/// Body of a delete that gave stock back
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedWithStock {
    pub id: Uuid,
    /// Stock of every item the deleted records drew from
    pub stock: Vec<StockLevel>,
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Page size clamped to `1..=MAX_PER_PAGE`
    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    /// Calculate zero-based offset for pagination
    pub fn offset(&self) -> u64 {
        self.page.max(1).saturating_sub(1) * self.limit()
    }
}
