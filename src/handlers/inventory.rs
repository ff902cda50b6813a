use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    entities::ItemKind,
    errors::ServiceError,
    services::{
        inventory_items::{
            AccessoryDetail, CreateAccessoryRequest, CreateMachineRequest, CreatePartRequest,
            MachineDetail, PartDetail, UpdateMachineRequest, UpdateStockItemRequest,
        },
        stock_aggregator::ReconciliationReport,
    },
    ApiResult, AppState,
};

pub fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_part))
        .route("/:id", get(get_part).patch(update_part).delete(delete_part))
}

pub fn accessory_routes() -> Router<AppState> {
    Router::new().route("/", post(create_accessory)).route(
        "/:id",
        get(get_accessory)
            .patch(update_accessory)
            .delete(delete_accessory),
    )
}

pub fn machine_routes() -> Router<AppState> {
    Router::new().route("/", post(create_machine)).route(
        "/:id",
        get(get_machine).patch(update_machine).delete(delete_machine),
    )
}

pub fn reconciliation_routes() -> Router<AppState> {
    Router::new().route("/reconciliation", get(reconciliation))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReconciliationQuery {
    /// Restrict the report to `Part` or `Accessory`
    pub kind: Option<ItemKind>,
}

/// Receive a part into a store
#[utoipa::path(
    post,
    path = "/api/v1/parts",
    request_body = CreatePartRequest,
    responses(
        (status = 201, description = "Part created", body = PartDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reference number taken", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_part(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePartRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    let part = state.services.inventory.create_part(payload).await?;
    Ok(created_response(part))
}

/// Get a part with its counter and ledger figures
#[utoipa::path(
    get,
    path = "/api/v1/parts/{id}",
    params(("id" = Uuid, Path, description = "Part ID")),
    responses(
        (status = 200, description = "Part found", body = PartDetail),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_part(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<PartDetail> {
    Ok(Json(state.services.inventory.get_part(id).await?))
}

/// Edit a part's descriptive fields or set its status by hand
#[utoipa::path(
    patch,
    path = "/api/v1/parts/{id}",
    params(("id" = Uuid, Path, description = "Part ID")),
    request_body = UpdateStockItemRequest,
    responses(
        (status = 200, description = "Part updated", body = PartDetail),
        (status = 400, description = "Counter fields are not editable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_part(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockItemRequest>,
) -> ApiResult<PartDetail> {
    require_edit(&user, Resource::InventoryItem)?;
    Ok(Json(state.services.inventory.update_part(id, payload).await?))
}

/// Delete a part no demand record points at
#[utoipa::path(
    delete,
    path = "/api/v1/parts/{id}",
    params(("id" = Uuid, Path, description = "Part ID")),
    responses(
        (status = 204, description = "Part deleted"),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Part still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_part(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    state.services.inventory.delete_part(id).await?;
    Ok(no_content_response())
}

/// Receive an accessory into a store
#[utoipa::path(
    post,
    path = "/api/v1/accessories",
    request_body = CreateAccessoryRequest,
    responses(
        (status = 201, description = "Accessory created", body = AccessoryDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reference number taken", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_accessory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAccessoryRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    let accessory = state.services.inventory.create_accessory(payload).await?;
    Ok(created_response(accessory))
}

#[utoipa::path(
    get,
    path = "/api/v1/accessories/{id}",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    responses(
        (status = 200, description = "Accessory found", body = AccessoryDetail),
        (status = 404, description = "Accessory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_accessory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AccessoryDetail> {
    Ok(Json(state.services.inventory.get_accessory(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/accessories/{id}",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    request_body = UpdateStockItemRequest,
    responses(
        (status = 200, description = "Accessory updated", body = AccessoryDetail),
        (status = 400, description = "Counter fields are not editable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Accessory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_accessory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockItemRequest>,
) -> ApiResult<AccessoryDetail> {
    require_edit(&user, Resource::InventoryItem)?;
    Ok(Json(
        state.services.inventory.update_accessory(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/accessories/{id}",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    responses(
        (status = 204, description = "Accessory deleted"),
        (status = 409, description = "Accessory still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_accessory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    state.services.inventory.delete_accessory(id).await?;
    Ok(no_content_response())
}

/// Register a machine
#[utoipa::path(
    post,
    path = "/api/v1/machines",
    request_body = CreateMachineRequest,
    responses(
        (status = 201, description = "Machine created", body = MachineDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Serial number taken", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMachineRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    let machine = state.services.inventory.create_machine(payload).await?;
    Ok(created_response(machine))
}

/// Get a machine and the lease or sale holding it
#[utoipa::path(
    get,
    path = "/api/v1/machines/{id}",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 200, description = "Machine found", body = MachineDetail),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MachineDetail> {
    Ok(Json(state.services.inventory.get_machine(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/machines/{id}",
    params(("id" = Uuid, Path, description = "Machine ID")),
    request_body = UpdateMachineRequest,
    responses(
        (status = 200, description = "Machine updated", body = MachineDetail),
        (status = 400, description = "Status change not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMachineRequest>,
) -> ApiResult<MachineDetail> {
    require_edit(&user, Resource::InventoryItem)?;
    Ok(Json(
        state.services.inventory.update_machine(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/machines/{id}",
    params(("id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 204, description = "Machine deleted"),
        (status = 409, description = "Machine still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    state.services.inventory.delete_machine(id).await?;
    Ok(no_content_response())
}

/// Compare every counter with the demand records drawn against it
#[utoipa::path(
    get,
    path = "/api/v1/inventory/reconciliation",
    params(ReconciliationQuery),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconciliationReport)
    ),
    tag = "inventory"
)]
pub async fn reconciliation(
    State(state): State<AppState>,
    Query(query): Query<ReconciliationQuery>,
) -> ApiResult<ReconciliationReport> {
    Ok(Json(state.services.aggregator.reconcile(query.kind).await?))
}
