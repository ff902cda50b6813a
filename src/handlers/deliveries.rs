use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, PaginationParams};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    errors::ServiceError,
    services::deliveries::{CreateDeliveryRequest, DeliveryDetail, UpdateDeliveryRequest},
    ApiResult, AppState,
};

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route(
            "/:id",
            get(get_delivery)
                .patch(update_delivery)
                .delete(delete_delivery),
        )
}

/// Schedule a delivery for a sale or a lease
#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    request_body = CreateDeliveryRequest,
    responses(
        (status = 201, description = "Delivery scheduled", body = DeliveryDetail),
        (status = 400, description = "Parent document missing or of the wrong type", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale or lease not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Response, ServiceError> {
    require_edit(
        &user,
        Resource::Delivery {
            assigned_to: payload.assigned_to,
        },
    )?;
    let delivery = state.services.deliveries.create(payload).await?;
    Ok(created_response(delivery))
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries",
    params(PaginationParams),
    responses((status = 200, description = "Deliveries page", body = Vec<DeliveryDetail>)),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Vec<DeliveryDetail>> {
    Ok(Json(
        state
            .services
            .deliveries
            .list(page.limit(), page.offset())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery with client and totals", body = DeliveryDetail),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryDetail> {
    Ok(Json(state.services.deliveries.get(id).await?))
}

/// Reassign, reschedule or move a delivery along its status
#[utoipa::path(
    patch,
    path = "/api/v1/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery updated", body = DeliveryDetail),
        (status = 403, description = "Not the assignee", body = crate::errors::ErrorResponse),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryRequest>,
) -> ApiResult<DeliveryDetail> {
    let existing = state.services.deliveries.get(id).await?;
    require_edit(
        &user,
        Resource::Delivery {
            assigned_to: existing.delivery.assigned_to,
        },
    )?;
    Ok(Json(state.services.deliveries.update(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 204, description = "Delivery deleted"),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn delete_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let existing = state.services.deliveries.get(id).await?;
    require_edit(
        &user,
        Resource::Delivery {
            assigned_to: existing.delivery.assigned_to,
        },
    )?;
    state.services.deliveries.delete(id).await?;
    Ok(no_content_response())
}
