use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, DeletedWithStock, PaginationParams};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    entities::{call, call::CallStatus, store_inquiry},
    errors::ServiceError,
    services::{
        calls::{ApprovalRequest, CallDetail, CallFilter, CreateCallRequest, UpdateCallRequest},
        store_inquiries::{
            CreateStoreInquiryRequest, StoreInquiryDetail, UpdateStoreInquiryRequest,
        },
    },
    ApiResult, AppState,
};

pub fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_calls).post(create_call))
        .route("/:id", get(get_call).patch(update_call).delete(delete_call))
        .route("/:id/approval", post(set_approval))
        .route("/:id/store-inquiries", get(list_call_store_inquiries))
}

pub fn store_inquiry_routes() -> Router<AppState> {
    Router::new().route("/", post(create_store_inquiry)).route(
        "/:id",
        get(get_store_inquiry)
            .patch(update_store_inquiry)
            .delete(delete_store_inquiry),
    )
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallListQuery {
    /// `open`, `pending`, `in_progress` or `complete`
    pub status: Option<String>,
    /// Only calls this technician is assigned to
    pub technician: Option<Uuid>,
    /// Earliest reported date, inclusive
    pub start_date: Option<NaiveDate>,
    /// Latest reported date, inclusive
    pub end_date: Option<NaiveDate>,
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

impl CallListQuery {
    fn filter(&self) -> Result<CallFilter, ServiceError> {
        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => Some(CallStatus::from_filter(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown call status: {}", raw))
            })?),
        };
        Ok(CallFilter {
            status,
            technician: self.technician,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Log a service call
#[utoipa::path(
    post,
    path = "/api/v1/calls",
    request_body = CreateCallRequest,
    responses(
        (status = 201, description = "Call logged", body = CallDetail),
        (status = 400, description = "Walk-in details or contract references missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Ticket number taken", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn create_call(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCallRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Call)?;
    let call = state.services.calls.create(payload).await?;
    Ok(created_response(call))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls",
    params(CallListQuery),
    responses(
        (status = 200, description = "Calls page, newest first", body = Vec<CallDetail>),
        (status = 400, description = "Unknown status or inverted period", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<CallListQuery>,
) -> ApiResult<Vec<CallDetail>> {
    let filter = query.filter()?;
    let page = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(Json(
        state
            .services
            .calls
            .list(filter, page.limit(), page.offset())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/{id}",
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call found", body = CallDetail),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn get_call(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<CallDetail> {
    Ok(Json(state.services.calls.get(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/calls/{id}",
    params(("id" = Uuid, Path, description = "Call ID")),
    request_body = UpdateCallRequest,
    responses(
        (status = 200, description = "Call updated", body = CallDetail),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn update_call(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCallRequest>,
) -> ApiResult<CallDetail> {
    require_edit(&user, Resource::Call)?;
    Ok(Json(state.services.calls.update(id, payload).await?))
}

/// Record the manager approval or client verification of a call
#[utoipa::path(
    post,
    path = "/api/v1/calls/{id}/approval",
    params(("id" = Uuid, Path, description = "Call ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Approval recorded", body = call::Model),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn set_approval(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalRequest>,
) -> ApiResult<call::Model> {
    require_edit(&user, Resource::Call)?;
    Ok(Json(
        state
            .services
            .calls
            .set_approval(id, payload.field, payload.value)
            .await?,
    ))
}

/// Delete a call and every requisition raised from it
#[utoipa::path(
    delete,
    path = "/api/v1/calls/{id}",
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call deleted", body = DeletedWithStock),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn delete_call(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedWithStock> {
    require_edit(&user, Resource::Call)?;
    let stock = state.services.calls.delete(id).await?;
    Ok(Json(DeletedWithStock { id, stock }))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/{id}/store-inquiries",
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Requisitions raised from the call", body = Vec<store_inquiry::Model>),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn list_call_store_inquiries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<store_inquiry::Model>> {
    state.services.calls.get(id).await?;
    Ok(Json(state.services.store_inquiries.list_for_call(id).await?))
}

/// Ask the store for a part on behalf of a call
#[utoipa::path(
    post,
    path = "/api/v1/store-inquiries",
    request_body = CreateStoreInquiryRequest,
    responses(
        (status = 201, description = "Requisition raised", body = StoreInquiryDetail),
        (status = 404, description = "Call or part not found", body = crate::errors::ErrorResponse)
    ),
    tag = "store-inquiries"
)]
pub async fn create_store_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreInquiryRequest>,
) -> Result<Response, ServiceError> {
    require_edit(
        &user,
        Resource::StoreInquiry {
            requested_by: user.user_id,
        },
    )?;
    let inquiry = state
        .services
        .store_inquiries
        .create(payload, user.user_id)
        .await?;
    Ok(created_response(inquiry))
}

#[utoipa::path(
    get,
    path = "/api/v1/store-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Store inquiry ID")),
    responses(
        (status = 200, description = "Requisition found", body = StoreInquiryDetail),
        (status = 404, description = "Requisition not found", body = crate::errors::ErrorResponse)
    ),
    tag = "store-inquiries"
)]
pub async fn get_store_inquiry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StoreInquiryDetail> {
    Ok(Json(state.services.store_inquiries.get(id).await?))
}

/// Edit, issue, reject or reopen a requisition
#[utoipa::path(
    patch,
    path = "/api/v1/store-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Store inquiry ID")),
    request_body = UpdateStoreInquiryRequest,
    responses(
        (status = 200, description = "Requisition updated", body = StoreInquiryDetail),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock to issue", body = crate::errors::ErrorResponse)
    ),
    tag = "store-inquiries"
)]
pub async fn update_store_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStoreInquiryRequest>,
) -> ApiResult<StoreInquiryDetail> {
    let existing = state.services.store_inquiries.get(id).await?;
    require_edit(
        &user,
        Resource::StoreInquiry {
            requested_by: existing.inquiry.requested_by,
        },
    )?;
    if payload.is_decision() {
        require_edit(&user, Resource::StoreInquiryDecision)?;
    }
    Ok(Json(
        state
            .services
            .store_inquiries
            .update(id, payload, user.user_id)
            .await?,
    ))
}

/// Delete a requisition and the lease parts fitted against it
#[utoipa::path(
    delete,
    path = "/api/v1/store-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Store inquiry ID")),
    responses(
        (status = 200, description = "Requisition deleted", body = DeletedWithStock),
        (status = 404, description = "Requisition not found", body = crate::errors::ErrorResponse)
    ),
    tag = "store-inquiries"
)]
pub async fn delete_store_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedWithStock> {
    let existing = state.services.store_inquiries.get(id).await?;
    require_edit(
        &user,
        Resource::StoreInquiry {
            requested_by: existing.inquiry.requested_by,
        },
    )?;
    let stock = state.services.store_inquiries.delete(id).await?;
    Ok(Json(DeletedWithStock { id, stock }))
}
