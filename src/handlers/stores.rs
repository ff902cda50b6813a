use axum::{
    extract::{Path, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    entities::{client, store},
    errors::ServiceError,
    services::inventory_items::{CreateClientRequest, CreateStoreRequest},
    ApiResult, AppState,
};

pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/:id", get(get_store).delete(delete_store))
}

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:id", get(get_client).delete(delete_client))
}

/// Create a store
#[utoipa::path(
    post,
    path = "/api/v1/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = store::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Store)?;
    let created = state.services.inventory.create_store(payload).await?;
    Ok(created_response(created))
}

/// List stores
#[utoipa::path(
    get,
    path = "/api/v1/stores",
    responses((status = 200, description = "All stores", body = Vec<store::Model>)),
    tag = "stores"
)]
pub async fn list_stores(State(state): State<AppState>) -> ApiResult<Vec<store::Model>> {
    Ok(Json(state.services.inventory.list_stores().await?))
}

/// Get a store
#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store found", body = store::Model),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<store::Model> {
    Ok(Json(state.services.inventory.get_store(id).await?))
}

/// Delete a store that holds no items
#[utoipa::path(
    delete,
    path = "/api/v1/stores/{id}",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 204, description = "Store deleted"),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Store still holds items", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn delete_store(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Store)?;
    state.services.inventory.delete_store(id).await?;
    Ok(no_content_response())
}

/// Create a client
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = client::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateClientRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Client)?;
    let created = state.services.inventory.create_client(payload).await?;
    Ok(created_response(created))
}

/// List clients
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    responses((status = 200, description = "All clients", body = Vec<client::Model>)),
    tag = "clients"
)]
pub async fn list_clients(State(state): State<AppState>) -> ApiResult<Vec<client::Model>> {
    Ok(Json(state.services.inventory.list_clients().await?))
}

/// Get a client
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client found", body = client::Model),
        (status = 404, description = "Client not found", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<client::Model> {
    Ok(Json(state.services.inventory.get_client(id).await?))
}

/// Delete a client nobody references
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 404, description = "Client not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Client still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Client)?;
    state.services.inventory.delete_client(id).await?;
    Ok(no_content_response())
}
