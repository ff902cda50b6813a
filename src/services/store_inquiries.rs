//! Store requisitions raised from service calls.
//!
//! An inquiry holds no stock itself. Stock moves when lease part inquiries
//! are created under it, so deleting an inquiry first routes those children
//! through the coordinator.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::demand_coordinator::{
    delete_lease_part_inquiry_in, parent_delete_error, validate_non_negative,
};
use super::stock_ledger::{self, StockLevel};
use crate::db::in_transaction;
use crate::entities::store_inquiry::StoreInquiryStatus;
use crate::entities::{call, lease_part_inquiry, part, store_inquiry, ItemRef};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStoreInquiryRequest {
    pub service_call_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub part_name: String,
    pub part_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative")]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub add_vat: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStoreInquiryRequest {
    #[validate(length(min = 1, max = 255))]
    pub part_name: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_non_negative")]
    pub unit_price: Option<Decimal>,
    pub add_vat: Option<bool>,
    pub notes: Option<String>,
    pub is_issued: Option<bool>,
    /// `Rejected` to turn the request down, `Pending` to reopen it
    pub status: Option<StoreInquiryStatus>,
}

impl UpdateStoreInquiryRequest {
    /// Rejecting and reopening are store decisions; issuing is open to the
    /// requester as well
    pub fn is_decision(&self) -> bool {
        self.status.is_some()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoreInquiryDetail {
    #[serde(flatten)]
    pub inquiry: store_inquiry::Model,
    /// Stock of the linked part, when the inquiry names one
    pub part_stock: Option<StockLevel>,
}

/// Deletes an inquiry after restoring the stock held by its lease part
/// inquiries. `children` must be every lease part inquiry under it.
pub async fn delete_store_inquiry_in<C>(
    conn: &C,
    inquiry: &store_inquiry::Model,
    children: &[lease_part_inquiry::Model],
    events: &mut Vec<Event>,
) -> Result<Vec<StockLevel>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut levels = Vec::with_capacity(children.len());
    for child in children {
        levels.push(delete_lease_part_inquiry_in(conn, child, events).await?);
    }

    let result = store_inquiry::Entity::delete_by_id(inquiry.id)
        .exec(conn)
        .await
        .map_err(parent_delete_error(format!("Store inquiry {}", inquiry.id)))?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!(
            "Store inquiry {} not found",
            inquiry.id
        )));
    }
    Ok(levels)
}

/// Lease part inquiries raised under each of `inquiries`
pub(crate) async fn children_of<C>(
    conn: &C,
    inquiries: &[store_inquiry::Model],
) -> Result<Vec<(store_inquiry::Model, Vec<lease_part_inquiry::Model>)>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut out = Vec::with_capacity(inquiries.len());
    for inquiry in inquiries {
        let children = lease_part_inquiry::Entity::find()
            .filter(lease_part_inquiry::Column::StoreInquiryId.eq(inquiry.id))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        out.push((inquiry.clone(), children));
    }
    Ok(out)
}

#[derive(Clone)]
pub struct StoreInquiryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StoreInquiryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, req), fields(call_id = %req.service_call_id))]
    pub async fn create(
        &self,
        req: CreateStoreInquiryRequest,
        requested_by: Uuid,
    ) -> Result<StoreInquiryDetail, ServiceError> {
        req.validate()?;
        let db = &*self.db;
        call::Entity::find_by_id(req.service_call_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Call {} not found", req.service_call_id))
            })?;
        if let Some(part_id) = req.part_id {
            part::Entity::find_by_id(part_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::NotFound(format!("Part {} not found", part_id)))?;
        }

        let inquiry = store_inquiry::ActiveModel {
            service_call_id: Set(req.service_call_id),
            part_name: Set(req.part_name),
            part_id: Set(req.part_id),
            quantity: Set(req.quantity),
            requested_by: Set(requested_by),
            unit_price: Set(req.unit_price),
            add_vat: Set(req.add_vat),
            is_issued: Set(false),
            issued_by: Set(None),
            status: Set(StoreInquiryStatus::Pending.as_str().to_string()),
            notes: Set(req.notes),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(inquiry_id = %inquiry.id, "store inquiry raised");
        self.detail(inquiry).await
    }

    pub async fn get(&self, id: Uuid) -> Result<StoreInquiryDetail, ServiceError> {
        let inquiry = self.find(id).await?;
        self.detail(inquiry).await
    }

    pub async fn list_for_call(&self, call_id: Uuid) -> Result<Vec<store_inquiry::Model>, ServiceError> {
        store_inquiry::Entity::find()
            .filter(store_inquiry::Column::ServiceCallId.eq(call_id))
            .order_by_desc(store_inquiry::Column::RequestedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Applies a patch on behalf of `actor`. Capability checks are the
    /// caller's job; this enforces the issue and reject rules.
    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateStoreInquiryRequest,
        actor: Uuid,
    ) -> Result<StoreInquiryDetail, ServiceError> {
        req.validate()?;
        let existing = self.find(id).await?;
        let quantity = req.quantity.unwrap_or(existing.quantity);
        let mut issued_event = None;

        let mut active: store_inquiry::ActiveModel = existing.clone().into();
        if let Some(part_name) = req.part_name {
            active.part_name = Set(part_name);
        }
        if let Some(q) = req.quantity {
            active.quantity = Set(q);
        }
        if let Some(unit_price) = req.unit_price {
            active.unit_price = Set(Some(unit_price));
        }
        if let Some(add_vat) = req.add_vat {
            active.add_vat = Set(add_vat);
        }
        if let Some(notes) = req.notes {
            active.notes = Set(Some(notes));
        }

        match req.status {
            Some(StoreInquiryStatus::Rejected) => {
                active.status = Set(StoreInquiryStatus::Rejected.as_str().to_string());
                active.is_issued = Set(false);
            }
            Some(StoreInquiryStatus::Pending) => {
                active.status = Set(StoreInquiryStatus::Pending.as_str().to_string());
                active.is_issued = Set(false);
            }
            Some(StoreInquiryStatus::Issued) => {
                return Err(ServiceError::ValidationError(
                    "Issue a store inquiry by setting is_issued".to_string(),
                ));
            }
            None => {}
        }

        match (existing.is_issued, req.is_issued) {
            (false, Some(true)) => {
                if req.status.is_some() {
                    return Err(ServiceError::ValidationError(
                        "is_issued and status cannot change together".to_string(),
                    ));
                }
                if existing.status == StoreInquiryStatus::Rejected.as_str() {
                    return Err(ServiceError::ValidationError(
                        "A rejected store inquiry cannot be issued".to_string(),
                    ));
                }
                if let Some(part_id) = existing.part_id {
                    let level = stock_ledger::stock_level(&*self.db, ItemRef::part(part_id)).await?;
                    if level.quantity < quantity {
                        return Err(ServiceError::InsufficientStock(format!(
                            "Insufficient stock. Only {} units available.",
                            level.quantity
                        )));
                    }
                }
                active.is_issued = Set(true);
                active.issued_by = Set(Some(actor));
                active.status = Set(StoreInquiryStatus::Issued.as_str().to_string());
                issued_event = Some(Event::StoreInquiryIssued {
                    inquiry_id: id,
                    issued_by: actor,
                });
            }
            (true, Some(false)) => {
                active.is_issued = Set(false);
                if req.status.is_none() {
                    active.status = Set(StoreInquiryStatus::Pending.as_str().to_string());
                }
            }
            _ => {}
        }

        let inquiry = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        if let Some(event) = issued_event {
            info!(inquiry_id = %id, issued_by = %actor, "store inquiry issued");
            self.event_sender.send_or_log(event).await;
        }
        self.detail(inquiry).await
    }

    /// Deletes the inquiry and every lease part inquiry under it, restoring
    /// their stock.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<Vec<StockLevel>, ServiceError> {
        let existing = self.find(id).await?;
        let mut tree = children_of(&*self.db, std::slice::from_ref(&existing)).await?;
        let (inquiry, children) = tree
            .pop()
            .ok_or_else(|| ServiceError::InternalError("store inquiry tree is empty".to_string()))?;

        let (levels, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let levels = delete_store_inquiry_in(txn, &inquiry, &children, &mut events).await?;
                Ok((levels, events))
            })
        })
        .await?;

        info!(inquiry_id = %id, restored = levels.len(), "store inquiry deleted");
        self.event_sender.send_all(events).await;
        Ok(levels)
    }

    async fn find(&self, id: Uuid) -> Result<store_inquiry::Model, ServiceError> {
        store_inquiry::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Store inquiry {} not found", id)))
    }

    async fn detail(&self, inquiry: store_inquiry::Model) -> Result<StoreInquiryDetail, ServiceError> {
        let part_stock = match inquiry.part_id {
            Some(part_id) => Some(stock_ledger::stock_level(&*self.db, ItemRef::part(part_id)).await?),
            None => None,
        };
        Ok(StoreInquiryDetail { inquiry, part_stock })
    }
}
