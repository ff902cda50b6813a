use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, patch, post},
    Router,
};
use uuid::Uuid;

use super::common::{created_response, DeletedWithStock, PaginationParams};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    entities::sale_item,
    errors::ServiceError,
    services::{
        demand_coordinator::{DemandOutcome, DemandPatch, NewSaleItem},
        sales::{CreateSaleRequest, SaleDetail, UpdateSaleRequest},
    },
    ApiResult, AppState,
};

pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale).patch(update_sale).delete(delete_sale))
        .route("/:id/items", post(add_sale_item))
}

pub fn sale_item_routes() -> Router<AppState> {
    Router::new().route("/:id", patch(update_sale_item).delete(delete_sale_item))
}

/// Record a sale and take every line from stock
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale created", body = SaleDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Sale)?;
    let sale = state.services.sales.create(payload).await?;
    Ok(created_response(sale))
}

/// List sales, newest first
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(PaginationParams),
    responses((status = 200, description = "Sales page", body = Vec<SaleDetail>)),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Vec<SaleDetail>> {
    Ok(Json(
        state
            .services
            .sales
            .list(page.limit(), page.offset())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale with its lines", body = SaleDetail),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn get_sale(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SaleDetail> {
    Ok(Json(state.services.sales.get(id).await?))
}

/// Edit the header and replace, adjust or drop lines in one transaction
#[utoipa::path(
    patch,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Sale updated", body = SaleDetail),
        (status = 404, description = "Sale or line not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn update_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleRequest>,
) -> ApiResult<SaleDetail> {
    require_edit(&user, Resource::Sale)?;
    Ok(Json(state.services.sales.update(id, payload).await?))
}

/// Delete a sale and give every line back to stock
#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale deleted", body = DeletedWithStock),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale has deliveries", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedWithStock> {
    require_edit(&user, Resource::Sale)?;
    let stock = state.services.sales.delete(id).await?;
    Ok(Json(DeletedWithStock { id, stock }))
}

/// Add one line to an existing sale
#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/items",
    params(("id" = Uuid, Path, description = "Sale ID")),
    request_body = NewSaleItem,
    responses(
        (status = 201, description = "Line added", body = DemandOutcome<sale_item::Model>),
        (status = 404, description = "Sale or item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn add_sale_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sale_id): Path<Uuid>,
    Json(payload): Json<NewSaleItem>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Sale)?;
    let outcome = state
        .services
        .coordinator
        .create_sale_item(sale_id, payload)
        .await?;
    Ok(created_response(outcome))
}

/// Change the quantity or price of one line
#[utoipa::path(
    patch,
    path = "/api/v1/sale-items/{id}",
    params(("id" = Uuid, Path, description = "Sale item ID")),
    request_body = DemandPatch,
    responses(
        (status = 200, description = "Line updated", body = DemandOutcome<sale_item::Model>),
        (status = 404, description = "Line not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn update_sale_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DemandPatch>,
) -> ApiResult<DemandOutcome<sale_item::Model>> {
    require_edit(&user, Resource::Sale)?;
    Ok(Json(
        state
            .services
            .coordinator
            .update_sale_item(id, payload)
            .await?,
    ))
}

/// Remove one line and restore its quantity
#[utoipa::path(
    delete,
    path = "/api/v1/sale-items/{id}",
    params(("id" = Uuid, Path, description = "Sale item ID")),
    responses(
        (status = 200, description = "Line removed", body = DemandOutcome<sale_item::Model>),
        (status = 404, description = "Line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn delete_sale_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DemandOutcome<sale_item::Model>> {
    require_edit(&user, Resource::Sale)?;
    Ok(Json(state.services.coordinator.delete_sale_item(id).await?))
}
