use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    entities::{client_machine, item_type},
    errors::ServiceError,
    services::{
        client_machines::{
            ClientMachineFilter, CreateClientMachineRequest, UpdateClientMachineRequest,
        },
        item_types::{CreateItemTypeRequest, ItemTypeFilter, UpdateItemTypeRequest},
    },
    ApiResult, AppState,
};

pub fn client_machine_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_client_machines).post(create_client_machine))
        .route(
            "/:id",
            get(get_client_machine)
                .patch(update_client_machine)
                .delete(delete_client_machine),
        )
}

pub fn item_type_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_item_types).post(create_item_type))
        .route(
            "/:id",
            get(get_item_type)
                .patch(update_item_type)
                .delete(delete_item_type),
        )
}

/// Register a customer's machine
#[utoipa::path(
    post,
    path = "/api/v1/client-machines",
    request_body = CreateClientMachineRequest,
    responses(
        (status = 201, description = "Machine registered", body = client_machine::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Serial number taken", body = crate::errors::ErrorResponse)
    ),
    tag = "client-machines"
)]
pub async fn create_client_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateClientMachineRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Call)?;
    let created = state.services.client_machines.create(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/client-machines",
    params(ClientMachineFilter),
    responses((status = 200, description = "Registered machines", body = Vec<client_machine::Model>)),
    tag = "client-machines"
)]
pub async fn list_client_machines(
    State(state): State<AppState>,
    Query(filter): Query<ClientMachineFilter>,
) -> ApiResult<Vec<client_machine::Model>> {
    Ok(Json(state.services.client_machines.list(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/client-machines/{id}",
    params(("id" = Uuid, Path, description = "Client machine ID")),
    responses(
        (status = 200, description = "Machine found", body = client_machine::Model),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    tag = "client-machines"
)]
pub async fn get_client_machine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<client_machine::Model> {
    Ok(Json(state.services.client_machines.get(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/client-machines/{id}",
    params(("id" = Uuid, Path, description = "Client machine ID")),
    request_body = UpdateClientMachineRequest,
    responses(
        (status = 200, description = "Machine updated", body = client_machine::Model),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Serial number taken", body = crate::errors::ErrorResponse)
    ),
    tag = "client-machines"
)]
pub async fn update_client_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientMachineRequest>,
) -> ApiResult<client_machine::Model> {
    require_edit(&user, Resource::Call)?;
    Ok(Json(state.services.client_machines.update(id, payload).await?))
}

/// Delete a machine no call points at
#[utoipa::path(
    delete,
    path = "/api/v1/client-machines/{id}",
    params(("id" = Uuid, Path, description = "Client machine ID")),
    responses(
        (status = 204, description = "Machine deleted"),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Machine still referenced by calls", body = crate::errors::ErrorResponse)
    ),
    tag = "client-machines"
)]
pub async fn delete_client_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Call)?;
    state.services.client_machines.delete(id).await?;
    Ok(no_content_response())
}

/// Add a machine, part or accessory type to the catalog
#[utoipa::path(
    post,
    path = "/api/v1/item-types",
    request_body = CreateItemTypeRequest,
    responses(
        (status = 201, description = "Type added", body = item_type::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name taken within the category", body = crate::errors::ErrorResponse)
    ),
    tag = "item-types"
)]
pub async fn create_item_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateItemTypeRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    let created = state.services.item_types.create(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/item-types",
    params(ItemTypeFilter),
    responses((status = 200, description = "Catalog entries", body = Vec<item_type::Model>)),
    tag = "item-types"
)]
pub async fn list_item_types(
    State(state): State<AppState>,
    Query(filter): Query<ItemTypeFilter>,
) -> ApiResult<Vec<item_type::Model>> {
    Ok(Json(state.services.item_types.list(filter.category).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/item-types/{id}",
    params(("id" = Uuid, Path, description = "Item type ID")),
    responses(
        (status = 200, description = "Type found", body = item_type::Model),
        (status = 404, description = "Type not found", body = crate::errors::ErrorResponse)
    ),
    tag = "item-types"
)]
pub async fn get_item_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<item_type::Model> {
    Ok(Json(state.services.item_types.get(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/item-types/{id}",
    params(("id" = Uuid, Path, description = "Item type ID")),
    request_body = UpdateItemTypeRequest,
    responses(
        (status = 200, description = "Type updated", body = item_type::Model),
        (status = 404, description = "Type not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name taken within the category", body = crate::errors::ErrorResponse)
    ),
    tag = "item-types"
)]
pub async fn update_item_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemTypeRequest>,
) -> ApiResult<item_type::Model> {
    require_edit(&user, Resource::InventoryItem)?;
    Ok(Json(state.services.item_types.update(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/item-types/{id}",
    params(("id" = Uuid, Path, description = "Item type ID")),
    responses(
        (status = 204, description = "Type removed"),
        (status = 404, description = "Type not found", body = crate::errors::ErrorResponse)
    ),
    tag = "item-types"
)]
pub async fn delete_item_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::InventoryItem)?;
    state.services.item_types.delete(id).await?;
    Ok(no_content_response())
}
