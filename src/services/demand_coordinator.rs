//! Keeps demand records and inventory counters in step.
//!
//! Each public operation runs in exactly one transaction: the stock write
//! from [`stock_ledger`] and the demand-record write commit together or not
//! at all. The `*_in` functions take an open connection so parent workflows
//! (sales, leases, store inquiries, calls) can route their children through
//! the same code inside their own transaction.
//!
//! Reads used only for validation happen before the transaction opens, and
//! the stock `UPDATE` is the first statement inside it. A transaction that
//! starts with a write takes the row lock immediately instead of upgrading a
//! stale read snapshot.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::stock_ledger::{self, Shortfall, StockLevel};
use crate::db::in_transaction;
use crate::entities::machine::MachineStatus;
use crate::entities::{
    lease_acc_inquiry, lease_contract, lease_part_inquiry, sale, sale_item, store_inquiry,
    store_inquiry::StoreInquiryStatus, DemandKind, ItemKind, ItemRef,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// A demand record together with the stock of the item it draws from
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DemandOutcome<T> {
    pub record: T,
    pub stock: StockLevel,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewSaleItem {
    pub sale_type: ItemKind,
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewLeasePartInquiry {
    pub lease_id: Uuid,
    pub store_inquiry_id: Uuid,
    pub part_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub amount: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub vat: Decimal,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub is_paid: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewLeaseAccInquiry {
    pub lease_id: Uuid,
    pub accessory_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub amount: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub vat: Decimal,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub is_paid: bool,
}

/// Partial update of a demand record. Fields that do not apply to the
/// record type are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct DemandPatch {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_non_negative")]
    pub unit_price: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub amount: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub vat: Option<Decimal>,
    pub is_paid: Option<bool>,
    pub date: Option<NaiveDate>,
}

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = validator::ValidationError::new("non_negative");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

fn item_for(kind: ItemKind, id: Uuid) -> ItemRef {
    ItemRef { kind, id }
}

fn stock_events(item: ItemRef, delta: i32, level: &StockLevel, events: &mut Vec<Event>) {
    if delta > 0 {
        events.push(Event::StockTaken {
            item,
            quantity: delta,
            remaining: level.quantity,
        });
        if level.quantity == 0 {
            events.push(Event::ItemOutOfStock(item));
        }
    } else if delta < 0 {
        events.push(Event::StockRestored {
            item,
            quantity: -delta,
            remaining: level.quantity,
        });
    }
}

/// Applies the difference between two quantities of the same demand.
async fn apply_delta<C>(
    conn: &C,
    item: ItemRef,
    old_quantity: i32,
    new_quantity: i32,
    events: &mut Vec<Event>,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let delta = new_quantity - old_quantity;
    let level = if delta > 0 {
        stock_ledger::take(conn, item, delta, Shortfall::Increase).await?
    } else if delta < 0 {
        stock_ledger::restore(conn, item, -delta).await?
    } else {
        return stock_ledger::stock_level(conn, item).await;
    };
    stock_events(item, delta, &level, events);
    Ok(level)
}

/// Maps a failed parent delete after its children were routed through the
/// coordinator. A restrict violation here means a child was added meanwhile.
pub(crate) fn parent_delete_error(what: String) -> impl FnOnce(sea_orm::DbErr) -> ServiceError {
    move |err| {
        if crate::errors::is_foreign_key_violation(&err) {
            ServiceError::Conflict(format!(
                "{} gained new records while being deleted; reload and retry",
                what
            ))
        } else {
            ServiceError::db_error(err)
        }
    }
}

fn concurrent_change(demand: DemandKind, id: Uuid) -> ServiceError {
    ServiceError::Conflict(format!(
        "{} {} was changed by another request; reload and retry",
        demand, id
    ))
}

// ---------------------------------------------------------------------------
// Sale items

fn sale_item_ref(record: &sale_item::Model) -> Result<ItemRef, ServiceError> {
    record.item_ref().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "sale item {} does not reference an item matching its sale type",
            record.id
        ))
    })
}

pub async fn create_sale_item_in<C>(
    conn: &C,
    sale_id: Uuid,
    input: &NewSaleItem,
    events: &mut Vec<Event>,
) -> Result<DemandOutcome<sale_item::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let item = item_for(input.sale_type, input.item_id);

    let stock = match item.kind {
        ItemKind::Machine => {
            if input.quantity != 1 {
                return Err(ServiceError::ValidationError(
                    "A machine is sold as a single unit; quantity must be 1".to_string(),
                ));
            }
            let level = stock_ledger::claim_machine(conn, item.id, MachineStatus::Sold).await?;
            events.push(Event::MachineStatusChanged {
                machine_id: item.id,
                from: MachineStatus::Available.as_str().to_string(),
                to: MachineStatus::Sold.as_str().to_string(),
            });
            level
        }
        ItemKind::Part | ItemKind::Accessory => {
            let level = stock_ledger::take(conn, item, input.quantity, Shortfall::Create).await?;
            stock_events(item, input.quantity, &level, events);
            level
        }
    };

    let record = sale_item::ActiveModel {
        sale_id: Set(sale_id),
        sale_type: Set(input.sale_type.as_str().to_string()),
        machine_id: Set((item.kind == ItemKind::Machine).then_some(item.id)),
        part_id: Set((item.kind == ItemKind::Part).then_some(item.id)),
        accessory_id: Set((item.kind == ItemKind::Accessory).then_some(item.id)),
        quantity: Set(input.quantity),
        unit_price: Set(input.unit_price),
        total_price: Set(input.unit_price * Decimal::from(input.quantity)),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    events.push(Event::DemandCreated {
        demand: DemandKind::SaleItem,
        record_id: record.id,
        item,
        quantity: record.quantity,
    });

    Ok(DemandOutcome { record, stock })
}

pub async fn update_sale_item_in<C>(
    conn: &C,
    existing: &sale_item::Model,
    patch: &DemandPatch,
    events: &mut Vec<Event>,
) -> Result<DemandOutcome<sale_item::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    patch.validate()?;
    let item = sale_item_ref(existing)?;
    let new_quantity = patch.quantity.unwrap_or(existing.quantity);

    if item.kind == ItemKind::Machine && new_quantity != 1 {
        return Err(ServiceError::ValidationError(
            "The quantity of a machine sale item cannot change".to_string(),
        ));
    }

    let stock = apply_delta(conn, item, existing.quantity, new_quantity, events).await?;

    let unit_price = patch.unit_price.unwrap_or(existing.unit_price);
    let result = sale_item::Entity::update_many()
        .col_expr(sale_item::Column::Quantity, Expr::value(new_quantity))
        .col_expr(sale_item::Column::UnitPrice, Expr::value(unit_price))
        .col_expr(
            sale_item::Column::TotalPrice,
            Expr::value(unit_price * Decimal::from(new_quantity)),
        )
        .col_expr(sale_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sale_item::Column::Id.eq(existing.id))
        .filter(sale_item::Column::Quantity.eq(existing.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(concurrent_change(DemandKind::SaleItem, existing.id));
    }

    let record = sale_item::Entity::find_by_id(existing.id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Sale item {} not found", existing.id)))?;

    events.push(Event::DemandUpdated {
        demand: DemandKind::SaleItem,
        record_id: record.id,
        item,
        old_quantity: existing.quantity,
        new_quantity,
    });

    Ok(DemandOutcome { record, stock })
}

pub async fn delete_sale_item_in<C>(
    conn: &C,
    existing: &sale_item::Model,
    events: &mut Vec<Event>,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let item = sale_item_ref(existing)?;

    let stock = match item.kind {
        ItemKind::Machine => {
            let level =
                stock_ledger::release_machine(conn, item.id, MachineStatus::Sold).await?;
            events.push(Event::MachineStatusChanged {
                machine_id: item.id,
                from: MachineStatus::Sold.as_str().to_string(),
                to: level.status.clone(),
            });
            level
        }
        ItemKind::Part | ItemKind::Accessory => {
            let level = stock_ledger::restore(conn, item, existing.quantity).await?;
            stock_events(item, -existing.quantity, &level, events);
            level
        }
    };

    let result = sale_item::Entity::delete_many()
        .filter(sale_item::Column::Id.eq(existing.id))
        .filter(sale_item::Column::Quantity.eq(existing.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(concurrent_change(DemandKind::SaleItem, existing.id));
    }

    events.push(Event::DemandDeleted {
        demand: DemandKind::SaleItem,
        record_id: existing.id,
        item,
        quantity: existing.quantity,
    });

    Ok(stock)
}

// ---------------------------------------------------------------------------
// Lease part inquiries

/// Reads the requisition a lease part inquiry is raised against, locking the
/// row where the backend supports it, and refuses a rejected or mismatched
/// one.
pub async fn check_store_inquiry_in<C>(
    conn: &C,
    input: &NewLeasePartInquiry,
) -> Result<store_inquiry::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let inquiry = store_inquiry::Entity::find_by_id(input.store_inquiry_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Store inquiry {} not found",
                input.store_inquiry_id
            ))
        })?;
    if inquiry.status == StoreInquiryStatus::Rejected.as_str() {
        return Err(ServiceError::ValidationError(format!(
            "Store inquiry {} was rejected",
            inquiry.id
        )));
    }
    if let Some(linked) = inquiry.part_id {
        if linked != input.part_id {
            return Err(ServiceError::ValidationError(
                "Part does not match the part requested by the store inquiry".to_string(),
            ));
        }
    }
    Ok(inquiry)
}

pub async fn create_lease_part_inquiry_in<C>(
    conn: &C,
    input: &NewLeasePartInquiry,
    events: &mut Vec<Event>,
) -> Result<DemandOutcome<lease_part_inquiry::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let item = ItemRef::part(input.part_id);

    let stock = stock_ledger::take(conn, item, input.quantity, Shortfall::Create).await?;
    stock_events(item, input.quantity, &stock, events);

    let record = lease_part_inquiry::ActiveModel {
        lease_id: Set(input.lease_id),
        store_inquiry_id: Set(input.store_inquiry_id),
        part_id: Set(input.part_id),
        quantity: Set(input.quantity),
        amount: Set(input.amount),
        vat: Set(input.vat),
        date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
        is_paid: Set(input.is_paid),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    events.push(Event::DemandCreated {
        demand: DemandKind::LeasePartInquiry,
        record_id: record.id,
        item,
        quantity: record.quantity,
    });

    Ok(DemandOutcome { record, stock })
}

pub async fn update_lease_part_inquiry_in<C>(
    conn: &C,
    existing: &lease_part_inquiry::Model,
    patch: &DemandPatch,
    events: &mut Vec<Event>,
) -> Result<DemandOutcome<lease_part_inquiry::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    patch.validate()?;
    let item = ItemRef::part(existing.part_id);
    let new_quantity = patch.quantity.unwrap_or(existing.quantity);

    let stock = apply_delta(conn, item, existing.quantity, new_quantity, events).await?;

    let result = lease_part_inquiry::Entity::update_many()
        .col_expr(lease_part_inquiry::Column::Quantity, Expr::value(new_quantity))
        .col_expr(
            lease_part_inquiry::Column::Amount,
            Expr::value(patch.amount.unwrap_or(existing.amount)),
        )
        .col_expr(
            lease_part_inquiry::Column::Vat,
            Expr::value(patch.vat.unwrap_or(existing.vat)),
        )
        .col_expr(
            lease_part_inquiry::Column::IsPaid,
            Expr::value(patch.is_paid.unwrap_or(existing.is_paid)),
        )
        .col_expr(
            lease_part_inquiry::Column::Date,
            Expr::value(patch.date.unwrap_or(existing.date)),
        )
        .col_expr(lease_part_inquiry::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(lease_part_inquiry::Column::Id.eq(existing.id))
        .filter(lease_part_inquiry::Column::Quantity.eq(existing.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(concurrent_change(DemandKind::LeasePartInquiry, existing.id));
    }

    let record = lease_part_inquiry::Entity::find_by_id(existing.id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Lease part inquiry {} not found", existing.id))
        })?;

    events.push(Event::DemandUpdated {
        demand: DemandKind::LeasePartInquiry,
        record_id: record.id,
        item,
        old_quantity: existing.quantity,
        new_quantity,
    });

    Ok(DemandOutcome { record, stock })
}

pub async fn delete_lease_part_inquiry_in<C>(
    conn: &C,
    existing: &lease_part_inquiry::Model,
    events: &mut Vec<Event>,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let item = ItemRef::part(existing.part_id);
    let stock = stock_ledger::restore(conn, item, existing.quantity).await?;
    stock_events(item, -existing.quantity, &stock, events);

    let result = lease_part_inquiry::Entity::delete_many()
        .filter(lease_part_inquiry::Column::Id.eq(existing.id))
        .filter(lease_part_inquiry::Column::Quantity.eq(existing.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(concurrent_change(DemandKind::LeasePartInquiry, existing.id));
    }

    events.push(Event::DemandDeleted {
        demand: DemandKind::LeasePartInquiry,
        record_id: existing.id,
        item,
        quantity: existing.quantity,
    });

    Ok(stock)
}

// ---------------------------------------------------------------------------
// Lease accessory inquiries

pub async fn create_lease_acc_inquiry_in<C>(
    conn: &C,
    input: &NewLeaseAccInquiry,
    events: &mut Vec<Event>,
) -> Result<DemandOutcome<lease_acc_inquiry::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let item = ItemRef::accessory(input.accessory_id);

    let stock = stock_ledger::take(conn, item, input.quantity, Shortfall::Create).await?;
    stock_events(item, input.quantity, &stock, events);

    let record = lease_acc_inquiry::ActiveModel {
        lease_id: Set(input.lease_id),
        accessory_id: Set(input.accessory_id),
        quantity: Set(input.quantity),
        amount: Set(input.amount),
        vat: Set(input.vat),
        date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
        is_paid: Set(input.is_paid),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    events.push(Event::DemandCreated {
        demand: DemandKind::LeaseAccInquiry,
        record_id: record.id,
        item,
        quantity: record.quantity,
    });

    Ok(DemandOutcome { record, stock })
}

pub async fn update_lease_acc_inquiry_in<C>(
    conn: &C,
    existing: &lease_acc_inquiry::Model,
    patch: &DemandPatch,
    events: &mut Vec<Event>,
) -> Result<DemandOutcome<lease_acc_inquiry::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    patch.validate()?;
    let item = ItemRef::accessory(existing.accessory_id);
    let new_quantity = patch.quantity.unwrap_or(existing.quantity);

    let stock = apply_delta(conn, item, existing.quantity, new_quantity, events).await?;

    let result = lease_acc_inquiry::Entity::update_many()
        .col_expr(lease_acc_inquiry::Column::Quantity, Expr::value(new_quantity))
        .col_expr(
            lease_acc_inquiry::Column::Amount,
            Expr::value(patch.amount.unwrap_or(existing.amount)),
        )
        .col_expr(
            lease_acc_inquiry::Column::Vat,
            Expr::value(patch.vat.unwrap_or(existing.vat)),
        )
        .col_expr(
            lease_acc_inquiry::Column::IsPaid,
            Expr::value(patch.is_paid.unwrap_or(existing.is_paid)),
        )
        .col_expr(
            lease_acc_inquiry::Column::Date,
            Expr::value(patch.date.unwrap_or(existing.date)),
        )
        .col_expr(lease_acc_inquiry::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(lease_acc_inquiry::Column::Id.eq(existing.id))
        .filter(lease_acc_inquiry::Column::Quantity.eq(existing.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(concurrent_change(DemandKind::LeaseAccInquiry, existing.id));
    }

    let record = lease_acc_inquiry::Entity::find_by_id(existing.id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Lease accessory inquiry {} not found", existing.id))
        })?;

    events.push(Event::DemandUpdated {
        demand: DemandKind::LeaseAccInquiry,
        record_id: record.id,
        item,
        old_quantity: existing.quantity,
        new_quantity,
    });

    Ok(DemandOutcome { record, stock })
}

pub async fn delete_lease_acc_inquiry_in<C>(
    conn: &C,
    existing: &lease_acc_inquiry::Model,
    events: &mut Vec<Event>,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let item = ItemRef::accessory(existing.accessory_id);
    let stock = stock_ledger::restore(conn, item, existing.quantity).await?;
    stock_events(item, -existing.quantity, &stock, events);

    let result = lease_acc_inquiry::Entity::delete_many()
        .filter(lease_acc_inquiry::Column::Id.eq(existing.id))
        .filter(lease_acc_inquiry::Column::Quantity.eq(existing.quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if result.rows_affected == 0 {
        return Err(concurrent_change(DemandKind::LeaseAccInquiry, existing.id));
    }

    events.push(Event::DemandDeleted {
        demand: DemandKind::LeaseAccInquiry,
        record_id: existing.id,
        item,
        quantity: existing.quantity,
    });

    Ok(stock)
}

// ---------------------------------------------------------------------------
// Service facade

/// Runs single demand-record mutations and publishes their events after
/// commit.
#[derive(Clone)]
pub struct DemandCoordinator {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl DemandCoordinator {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(sale_id = %sale_id, item_id = %input.item_id))]
    pub async fn create_sale_item(
        &self,
        sale_id: Uuid,
        input: NewSaleItem,
    ) -> Result<DemandOutcome<sale_item::Model>, ServiceError> {
        input.validate()?;
        sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let outcome = create_sale_item_in(txn, sale_id, &input, &mut events).await?;
                Ok((outcome, events))
            })
        })
        .await?;

        info!(sale_item_id = %outcome.record.id, quantity = outcome.record.quantity, "sale item created");
        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_sale_item(
        &self,
        id: Uuid,
        patch: DemandPatch,
    ) -> Result<DemandOutcome<sale_item::Model>, ServiceError> {
        patch.validate()?;
        let existing = self.sale_item(id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let outcome = update_sale_item_in(txn, &existing, &patch, &mut events).await?;
                Ok((outcome, events))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn delete_sale_item(
        &self,
        id: Uuid,
    ) -> Result<DemandOutcome<sale_item::Model>, ServiceError> {
        let existing = self.sale_item(id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let stock = delete_sale_item_in(txn, &existing, &mut events).await?;
                Ok((
                    DemandOutcome {
                        record: existing,
                        stock,
                    },
                    events,
                ))
            })
        })
        .await?;

        info!(sale_item_id = %id, "sale item deleted");
        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self, input), fields(lease_id = %input.lease_id, part_id = %input.part_id))]
    pub async fn create_lease_part_inquiry(
        &self,
        input: NewLeasePartInquiry,
    ) -> Result<DemandOutcome<lease_part_inquiry::Model>, ServiceError> {
        input.validate()?;
        self.require_lease(input.lease_id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                check_store_inquiry_in(txn, &input).await?;
                let outcome = create_lease_part_inquiry_in(txn, &input, &mut events).await?;
                Ok((outcome, events))
            })
        })
        .await?;

        info!(inquiry_id = %outcome.record.id, quantity = outcome.record.quantity, "lease part inquiry created");
        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_lease_part_inquiry(
        &self,
        id: Uuid,
        patch: DemandPatch,
    ) -> Result<DemandOutcome<lease_part_inquiry::Model>, ServiceError> {
        patch.validate()?;
        let existing = self.lease_part_inquiry(id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let outcome =
                    update_lease_part_inquiry_in(txn, &existing, &patch, &mut events).await?;
                Ok((outcome, events))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn delete_lease_part_inquiry(
        &self,
        id: Uuid,
    ) -> Result<DemandOutcome<lease_part_inquiry::Model>, ServiceError> {
        let existing = self.lease_part_inquiry(id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let stock = delete_lease_part_inquiry_in(txn, &existing, &mut events).await?;
                Ok((
                    DemandOutcome {
                        record: existing,
                        stock,
                    },
                    events,
                ))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self, input), fields(lease_id = %input.lease_id, accessory_id = %input.accessory_id))]
    pub async fn create_lease_acc_inquiry(
        &self,
        input: NewLeaseAccInquiry,
    ) -> Result<DemandOutcome<lease_acc_inquiry::Model>, ServiceError> {
        input.validate()?;
        self.require_lease(input.lease_id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let outcome = create_lease_acc_inquiry_in(txn, &input, &mut events).await?;
                Ok((outcome, events))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_lease_acc_inquiry(
        &self,
        id: Uuid,
        patch: DemandPatch,
    ) -> Result<DemandOutcome<lease_acc_inquiry::Model>, ServiceError> {
        patch.validate()?;
        let existing = self.lease_acc_inquiry(id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let outcome =
                    update_lease_acc_inquiry_in(txn, &existing, &patch, &mut events).await?;
                Ok((outcome, events))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn delete_lease_acc_inquiry(
        &self,
        id: Uuid,
    ) -> Result<DemandOutcome<lease_acc_inquiry::Model>, ServiceError> {
        let existing = self.lease_acc_inquiry(id).await?;

        let (outcome, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let stock = delete_lease_acc_inquiry_in(txn, &existing, &mut events).await?;
                Ok((
                    DemandOutcome {
                        record: existing,
                        stock,
                    },
                    events,
                ))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        Ok(outcome)
    }

    async fn require_lease(&self, lease_id: Uuid) -> Result<lease_contract::Model, ServiceError> {
        lease_contract::Entity::find_by_id(lease_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lease contract {} not found", lease_id)))
    }

    async fn sale_item(&self, id: Uuid) -> Result<sale_item::Model, ServiceError> {
        sale_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale item {} not found", id)))
    }

    async fn lease_part_inquiry(&self, id: Uuid) -> Result<lease_part_inquiry::Model, ServiceError> {
        lease_part_inquiry::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lease part inquiry {} not found", id)))
    }

    async fn lease_acc_inquiry(&self, id: Uuid) -> Result<lease_acc_inquiry::Model, ServiceError> {
        lease_acc_inquiry::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Lease accessory inquiry {} not found", id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn part_line(part_id: Uuid, quantity: i32) -> NewSaleItem {
        NewSaleItem {
            sale_type: ItemKind::Part,
            item_id: part_id,
            quantity,
            unit_price: dec!(12.50),
        }
    }

    #[tokio::test]
    async fn create_takes_stock_and_prices_the_line() {
        let ctx = TestContext::new().await;
        let part = seed_part(&ctx.db, ctx.store, 10).await;
        let sale = seed_sale(&ctx.db).await;

        let outcome = ctx
            .coordinator
            .create_sale_item(sale, part_line(part, 4))
            .await
            .unwrap();

        assert_eq!(outcome.record.total_price, dec!(50.00));
        assert_eq!(outcome.stock.quantity, 6);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_no_record_behind() {
        let ctx = TestContext::new().await;
        let part = seed_part(&ctx.db, ctx.store, 2).await;
        let sale = seed_sale(&ctx.db).await;

        let err = ctx
            .coordinator
            .create_sale_item(sale, part_line(part, 3))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InsufficientStock(_));

        let lines = sale_item::Entity::find().all(&*ctx.db).await.unwrap();
        assert!(lines.is_empty());
        assert_eq!(part_quantity(&ctx.db, part).await, 2);
    }

    #[tokio::test]
    async fn update_applies_only_the_delta() {
        let ctx = TestContext::new().await;
        let part = seed_part(&ctx.db, ctx.store, 10).await;
        let sale = seed_sale(&ctx.db).await;
        let line = ctx
            .coordinator
            .create_sale_item(sale, part_line(part, 4))
            .await
            .unwrap()
            .record;

        let grown = ctx
            .coordinator
            .update_sale_item(
                line.id,
                DemandPatch {
                    quantity: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(grown.stock.quantity, 3);
        assert_eq!(grown.record.total_price, dec!(87.50));

        let err = ctx
            .coordinator
            .update_sale_item(
                line.id,
                DemandPatch {
                    quantity: Some(11),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InsufficientStock(msg) if msg == "Insufficient stock for increase. Only 3 additional units available.");

        let unchanged = ctx
            .coordinator
            .update_sale_item(
                line.id,
                DemandPatch {
                    unit_price: Some(dec!(10.00)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unchanged.stock.quantity, 3);
        assert_eq!(unchanged.record.total_price, dec!(70.00));
    }

    #[tokio::test]
    async fn delete_then_recreate_round_trips_quantity() {
        let ctx = TestContext::new().await;
        let part = seed_part(&ctx.db, ctx.store, 5).await;
        let sale = seed_sale(&ctx.db).await;

        let line = ctx
            .coordinator
            .create_sale_item(sale, part_line(part, 5))
            .await
            .unwrap();
        assert_eq!(line.stock.status, "Out of Stock");

        let deleted = ctx.coordinator.delete_sale_item(line.record.id).await.unwrap();
        assert_eq!(deleted.stock.quantity, 5);
        assert_eq!(deleted.stock.status, "Available");

        let again = ctx
            .coordinator
            .create_sale_item(sale, part_line(part, 5))
            .await
            .unwrap();
        assert_eq!(again.stock.quantity, 0);
    }

    #[tokio::test]
    async fn machine_lines_are_single_units() {
        let ctx = TestContext::new().await;
        let machine = seed_machine(&ctx.db, ctx.store, "MX-77").await;
        let sale = seed_sale(&ctx.db).await;

        let err = ctx
            .coordinator
            .create_sale_item(
                sale,
                NewSaleItem {
                    sale_type: ItemKind::Machine,
                    item_id: machine,
                    quantity: 2,
                    unit_price: dec!(900),
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));

        let sold = ctx
            .coordinator
            .create_sale_item(
                sale,
                NewSaleItem {
                    sale_type: ItemKind::Machine,
                    item_id: machine,
                    quantity: 1,
                    unit_price: dec!(900),
                },
            )
            .await
            .unwrap();
        assert_eq!(sold.stock.status, "Sold");
        assert_eq!(sold.stock.quantity, 1);

        let released = ctx.coordinator.delete_sale_item(sold.record.id).await.unwrap();
        assert_eq!(released.stock.status, "Available");
    }

    fn fitted(lease_id: Uuid, store_inquiry_id: Uuid, part_id: Uuid, quantity: i32) -> NewLeasePartInquiry {
        NewLeasePartInquiry {
            lease_id,
            store_inquiry_id,
            part_id,
            quantity,
            amount: dec!(0),
            vat: dec!(0),
            date: None,
            is_paid: false,
        }
    }

    #[tokio::test]
    async fn rejected_or_mismatched_requisition_takes_no_stock() {
        let ctx = TestContext::new().await;
        let part = seed_part(&ctx.db, ctx.store, 6).await;
        let other_part = seed_part(&ctx.db, ctx.store, 6).await;
        let lease = seed_lease(&ctx.db, ctx.store, true).await;
        let call = seed_walk_in_call(&ctx.db).await;
        let rejected =
            seed_store_inquiry(&ctx.db, call, part, 2, StoreInquiryStatus::Rejected).await;
        let pending = seed_store_inquiry(&ctx.db, call, part, 2, StoreInquiryStatus::Pending).await;

        let err = ctx
            .coordinator
            .create_lease_part_inquiry(fitted(lease, rejected, part, 2))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("was rejected"));

        let err = ctx
            .coordinator
            .create_lease_part_inquiry(fitted(lease, pending, other_part, 2))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));

        assert_eq!(part_quantity(&ctx.db, part).await, 6);
        assert_eq!(part_quantity(&ctx.db, other_part).await, 6);
        assert!(lease_part_inquiry::Entity::find()
            .all(&*ctx.db)
            .await
            .unwrap()
            .is_empty());

        let accepted = ctx
            .coordinator
            .create_lease_part_inquiry(fitted(lease, pending, part, 2))
            .await
            .unwrap();
        assert_eq!(accepted.stock.quantity, 4);
    }

    #[test]
    fn negative_money_is_rejected() {
        assert!(validate_non_negative(&dec!(-0.01)).is_err());
        assert!(validate_non_negative(&dec!(0)).is_ok());
    }
}
