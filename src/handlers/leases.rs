use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{created_response, DeletedWithStock, PaginationParams};
use crate::{
    auth::{require_edit, AuthUser, Resource},
    entities::{lease_acc_inquiry, lease_contract, lease_part_inquiry, meter_reading},
    errors::ServiceError,
    services::{
        demand_coordinator::{DemandOutcome, DemandPatch, NewLeaseAccInquiry, NewLeasePartInquiry},
        leases::{CreateLeaseRequest, LeaseDetail, UpdateLeaseRequest},
        meter_readings::CreateMeterReadingRequest,
    },
    ApiResult, AppState,
};

pub fn lease_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_leases).post(create_lease))
        .route(
            "/:id",
            get(get_lease).patch(update_lease).delete(delete_lease),
        )
        .route("/:id/meter-readings", get(list_meter_readings))
        .route("/:id/missing-readings", get(missing_readings))
}

pub fn meter_reading_routes() -> Router<AppState> {
    Router::new().route("/", post(create_meter_reading))
}

pub fn lease_part_inquiry_routes() -> Router<AppState> {
    Router::new().route("/", post(create_lease_part_inquiry)).route(
        "/:id",
        patch(update_lease_part_inquiry).delete(delete_lease_part_inquiry),
    )
}

pub fn lease_acc_inquiry_routes() -> Router<AppState> {
    Router::new().route("/", post(create_lease_acc_inquiry)).route(
        "/:id",
        patch(update_lease_acc_inquiry).delete(delete_lease_acc_inquiry),
    )
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaseListQuery {
    /// Only contracts that are still running
    #[serde(default)]
    pub active_only: bool,
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

#[derive(Debug, Serialize, ToSchema)]
pub struct MissingReadingsResponse {
    pub lease_id: Uuid,
    /// Months without a reading, `YYYY-MM`, oldest first
    pub months: Vec<String>,
}

/// Open a lease contract; an active lease claims its machine
#[utoipa::path(
    post,
    path = "/api/v1/leases",
    request_body = CreateLeaseRequest,
    responses(
        (status = 201, description = "Lease created", body = LeaseDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 422, description = "Machine not available", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn create_lease(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateLeaseRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Lease)?;
    let lease = state.services.leases.create(payload).await?;
    Ok(created_response(lease))
}

#[utoipa::path(
    get,
    path = "/api/v1/leases",
    params(LeaseListQuery),
    responses((status = 200, description = "Lease contracts", body = Vec<lease_contract::Model>)),
    tag = "leases"
)]
pub async fn list_leases(
    State(state): State<AppState>,
    Query(query): Query<LeaseListQuery>,
) -> ApiResult<Vec<lease_contract::Model>> {
    let page = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(Json(
        state
            .services
            .leases
            .list(query.active_only, page.limit(), page.offset())
            .await?,
    ))
}

/// Get a lease with its part and accessory inquiries
#[utoipa::path(
    get,
    path = "/api/v1/leases/{id}",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease found", body = LeaseDetail),
        (status = 404, description = "Lease not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn get_lease(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<LeaseDetail> {
    Ok(Json(state.services.leases.get(id).await?))
}

/// Edit a lease; toggling `is_active` claims or releases the machine
#[utoipa::path(
    patch,
    path = "/api/v1/leases/{id}",
    params(("id" = Uuid, Path, description = "Lease ID")),
    request_body = UpdateLeaseRequest,
    responses(
        (status = 200, description = "Lease updated", body = LeaseDetail),
        (status = 404, description = "Lease not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Machine not available", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn update_lease(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLeaseRequest>,
) -> ApiResult<LeaseDetail> {
    require_edit(&user, Resource::Lease)?;
    Ok(Json(state.services.leases.update(id, payload).await?))
}

/// Delete a lease, its inquiries and readings, restoring stock
#[utoipa::path(
    delete,
    path = "/api/v1/leases/{id}",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease deleted", body = DeletedWithStock),
        (status = 404, description = "Lease not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Lease has deliveries", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn delete_lease(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedWithStock> {
    require_edit(&user, Resource::Lease)?;
    let stock = state.services.leases.delete(id).await?;
    Ok(Json(DeletedWithStock { id, stock }))
}

#[utoipa::path(
    get,
    path = "/api/v1/leases/{id}/meter-readings",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Readings, newest first", body = Vec<meter_reading::Model>),
        (status = 404, description = "Lease not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn list_meter_readings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<meter_reading::Model>> {
    state.services.leases.find(id).await?;
    Ok(Json(state.services.meter_readings.list_for_lease(id).await?))
}

/// Months of the contract period that still lack a reading
#[utoipa::path(
    get,
    path = "/api/v1/leases/{id}/missing-readings",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Missing months", body = MissingReadingsResponse),
        (status = 404, description = "Lease not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn missing_readings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MissingReadingsResponse> {
    let today = chrono::Utc::now().date_naive();
    let months = state.services.leases.missing_readings(id, today).await?;
    Ok(Json(MissingReadingsResponse {
        lease_id: id,
        months,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/meter-readings",
    request_body = CreateMeterReadingRequest,
    responses(
        (status = 201, description = "Reading recorded", body = meter_reading::Model),
        (status = 400, description = "Month already recorded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Lease not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn create_meter_reading(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMeterReadingRequest>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Lease)?;
    let reading = state.services.meter_readings.create(payload).await?;
    Ok(created_response(reading))
}

/// Fit parts to a leased machine against an issued store inquiry
#[utoipa::path(
    post,
    path = "/api/v1/lease-part-inquiries",
    request_body = NewLeasePartInquiry,
    responses(
        (status = 201, description = "Parts taken", body = DemandOutcome<lease_part_inquiry::Model>),
        (status = 400, description = "Store inquiry not issued", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn create_lease_part_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewLeasePartInquiry>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Lease)?;
    let outcome = state
        .services
        .coordinator
        .create_lease_part_inquiry(payload)
        .await?;
    Ok(created_response(outcome))
}

#[utoipa::path(
    patch,
    path = "/api/v1/lease-part-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Lease part inquiry ID")),
    request_body = DemandPatch,
    responses(
        (status = 200, description = "Inquiry updated", body = DemandOutcome<lease_part_inquiry::Model>),
        (status = 404, description = "Inquiry not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn update_lease_part_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DemandPatch>,
) -> ApiResult<DemandOutcome<lease_part_inquiry::Model>> {
    require_edit(&user, Resource::Lease)?;
    Ok(Json(
        state
            .services
            .coordinator
            .update_lease_part_inquiry(id, payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lease-part-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Lease part inquiry ID")),
    responses(
        (status = 200, description = "Inquiry removed, parts restored", body = DemandOutcome<lease_part_inquiry::Model>),
        (status = 404, description = "Inquiry not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn delete_lease_part_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DemandOutcome<lease_part_inquiry::Model>> {
    require_edit(&user, Resource::Lease)?;
    Ok(Json(
        state
            .services
            .coordinator
            .delete_lease_part_inquiry(id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/lease-acc-inquiries",
    request_body = NewLeaseAccInquiry,
    responses(
        (status = 201, description = "Accessories taken", body = DemandOutcome<lease_acc_inquiry::Model>),
        (status = 404, description = "Lease or accessory not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn create_lease_acc_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewLeaseAccInquiry>,
) -> Result<Response, ServiceError> {
    require_edit(&user, Resource::Lease)?;
    let outcome = state
        .services
        .coordinator
        .create_lease_acc_inquiry(payload)
        .await?;
    Ok(created_response(outcome))
}

#[utoipa::path(
    patch,
    path = "/api/v1/lease-acc-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Lease accessory inquiry ID")),
    request_body = DemandPatch,
    responses(
        (status = 200, description = "Inquiry updated", body = DemandOutcome<lease_acc_inquiry::Model>),
        (status = 404, description = "Inquiry not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn update_lease_acc_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DemandPatch>,
) -> ApiResult<DemandOutcome<lease_acc_inquiry::Model>> {
    require_edit(&user, Resource::Lease)?;
    Ok(Json(
        state
            .services
            .coordinator
            .update_lease_acc_inquiry(id, payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lease-acc-inquiries/{id}",
    params(("id" = Uuid, Path, description = "Lease accessory inquiry ID")),
    responses(
        (status = 200, description = "Inquiry removed, accessories restored", body = DemandOutcome<lease_acc_inquiry::Model>),
        (status = 404, description = "Inquiry not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leases"
)]
pub async fn delete_lease_acc_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DemandOutcome<lease_acc_inquiry::Model>> {
    require_edit(&user, Resource::Lease)?;
    Ok(Json(
        state
            .services
            .coordinator
            .delete_lease_acc_inquiry(id)
            .await?,
    ))
}
