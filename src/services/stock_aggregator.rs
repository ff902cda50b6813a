//! Read-time stock figures derived from live demand records.
//!
//! Nothing here is stored; every view is recomputed from `sale_items`,
//! `lease_part_inquiries` and `lease_acc_inquiries` on each call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::stock_ledger::not_found;
use crate::entities::{
    accessory, lease_acc_inquiry, lease_contract, lease_part_inquiry, part, sale_item, ItemKind,
    ItemRef,
};
use crate::errors::ServiceError;

/// Counter and ledger figures for one part or accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockView {
    pub item_id: Uuid,
    pub kind: ItemKind,
    pub initial_quantity: i32,
    pub quantity: i32,
    pub status: String,
    /// Units on active leases
    pub leased_quantity: i64,
    pub sold_quantity: i64,
    /// `initial_quantity - leased_quantity - sold_quantity`; may be negative
    pub available_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Discrepancy {
    pub item_id: Uuid,
    pub kind: ItemKind,
    pub name: String,
    pub initial_quantity: i32,
    pub quantity: i32,
    pub expected_quantity: i64,
    /// `quantity - expected_quantity`
    pub difference: i64,
}

/// Parts and accessories whose counter disagrees with their demand records
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationReport {
    pub generated_at: DateTime<Utc>,
    pub items_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

#[derive(Debug, FromQueryResult)]
struct QuantityTotal {
    total: Option<i64>,
}

fn divisible_only(item: ItemRef) -> Result<(), ServiceError> {
    if item.kind == ItemKind::Machine {
        return Err(ServiceError::ValidationError(
            "Stock views are kept for parts and accessories only".to_string(),
        ));
    }
    Ok(())
}

/// Units of `item` committed to leases that are still active.
pub async fn leased_quantity<C>(conn: &C, item: ItemRef) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    divisible_only(item)?;
    let total = match item.kind {
        ItemKind::Part => {
            lease_part_inquiry::Entity::find()
                .select_only()
                .column_as(
                    Expr::col((
                        lease_part_inquiry::Entity,
                        lease_part_inquiry::Column::Quantity,
                    ))
                    .sum(),
                    "total",
                )
                .join(
                    JoinType::InnerJoin,
                    lease_part_inquiry::Relation::LeaseContract.def(),
                )
                .filter(lease_part_inquiry::Column::PartId.eq(item.id))
                .filter(lease_contract::Column::IsActive.eq(true))
                .into_model::<QuantityTotal>()
                .one(conn)
                .await
        }
        _ => {
            lease_acc_inquiry::Entity::find()
                .select_only()
                .column_as(
                    Expr::col((
                        lease_acc_inquiry::Entity,
                        lease_acc_inquiry::Column::Quantity,
                    ))
                    .sum(),
                    "total",
                )
                .join(
                    JoinType::InnerJoin,
                    lease_acc_inquiry::Relation::LeaseContract.def(),
                )
                .filter(lease_acc_inquiry::Column::AccessoryId.eq(item.id))
                .filter(lease_contract::Column::IsActive.eq(true))
                .into_model::<QuantityTotal>()
                .one(conn)
                .await
        }
    }
    .map_err(ServiceError::db_error)?;

    Ok(total.and_then(|t| t.total).unwrap_or(0))
}

/// Units of `item` on sale lines.
pub async fn sold_quantity<C>(conn: &C, item: ItemRef) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    divisible_only(item)?;
    let column = match item.kind {
        ItemKind::Part => sale_item::Column::PartId,
        _ => sale_item::Column::AccessoryId,
    };

    let total = sale_item::Entity::find()
        .select_only()
        .column_as(Expr::col(sale_item::Column::Quantity).sum(), "total")
        .filter(column.eq(item.id))
        .into_model::<QuantityTotal>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(total.and_then(|t| t.total).unwrap_or(0))
}

/// `initial_quantity - leased - sold`.
pub async fn available_quantity<C>(conn: &C, item: ItemRef) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(stock_view(conn, item).await?.available_quantity)
}

pub async fn stock_view<C>(conn: &C, item: ItemRef) -> Result<StockView, ServiceError>
where
    C: ConnectionTrait,
{
    divisible_only(item)?;
    let (initial_quantity, quantity, status) = match item.kind {
        ItemKind::Part => part::Entity::find_by_id(item.id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|p| (p.initial_quantity, p.quantity, p.status)),
        _ => accessory::Entity::find_by_id(item.id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|a| (a.initial_quantity, a.quantity, a.status)),
    }
    .ok_or_else(|| not_found(item.kind, item.id))?;

    let leased_quantity = leased_quantity(conn, item).await?;
    let sold_quantity = sold_quantity(conn, item).await?;

    Ok(StockView {
        item_id: item.id,
        kind: item.kind,
        initial_quantity,
        quantity,
        status,
        leased_quantity,
        sold_quantity,
        available_quantity: i64::from(initial_quantity) - leased_quantity - sold_quantity,
    })
}

/// Per-item totals of a grouped `SUM(quantity)`
fn totals(rows: Vec<(Uuid, i64)>) -> HashMap<Uuid, i64> {
    rows.into_iter().collect()
}

/// Compares every counter with `initial - all lease rows - sold`.
///
/// Lease rows count whether or not their contract is still active: closing a
/// lease does not put parts back on the shelf.
pub async fn reconcile<C>(
    conn: &C,
    kind: Option<ItemKind>,
) -> Result<ReconciliationReport, ServiceError>
where
    C: ConnectionTrait,
{
    let mut discrepancies = Vec::new();
    let mut items_checked = 0usize;

    if kind.map_or(true, |k| k == ItemKind::Part) {
        let leased = totals(
            lease_part_inquiry::Entity::find()
                .select_only()
                .column(lease_part_inquiry::Column::PartId)
                .column_as(Expr::col(lease_part_inquiry::Column::Quantity).sum(), "total")
                .group_by(lease_part_inquiry::Column::PartId)
                .into_tuple::<(Uuid, i64)>()
                .all(conn)
                .await
                .map_err(ServiceError::db_error)?,
        );
        let sold = totals(
            sale_item::Entity::find()
                .select_only()
                .column(sale_item::Column::PartId)
                .column_as(Expr::col(sale_item::Column::Quantity).sum(), "total")
                .filter(sale_item::Column::PartId.is_not_null())
                .group_by(sale_item::Column::PartId)
                .into_tuple::<(Uuid, i64)>()
                .all(conn)
                .await
                .map_err(ServiceError::db_error)?,
        );

        for p in part::Entity::find()
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
        {
            items_checked += 1;
            let expected = i64::from(p.initial_quantity)
                - leased.get(&p.id).copied().unwrap_or(0)
                - sold.get(&p.id).copied().unwrap_or(0);
            if expected != i64::from(p.quantity) {
                discrepancies.push(Discrepancy {
                    item_id: p.id,
                    kind: ItemKind::Part,
                    name: p.part_name,
                    initial_quantity: p.initial_quantity,
                    quantity: p.quantity,
                    expected_quantity: expected,
                    difference: i64::from(p.quantity) - expected,
                });
            }
        }
    }

    if kind.map_or(true, |k| k == ItemKind::Accessory) {
        let leased = totals(
            lease_acc_inquiry::Entity::find()
                .select_only()
                .column(lease_acc_inquiry::Column::AccessoryId)
                .column_as(Expr::col(lease_acc_inquiry::Column::Quantity).sum(), "total")
                .group_by(lease_acc_inquiry::Column::AccessoryId)
                .into_tuple::<(Uuid, i64)>()
                .all(conn)
                .await
                .map_err(ServiceError::db_error)?,
        );
        let sold = totals(
            sale_item::Entity::find()
                .select_only()
                .column(sale_item::Column::AccessoryId)
                .column_as(Expr::col(sale_item::Column::Quantity).sum(), "total")
                .filter(sale_item::Column::AccessoryId.is_not_null())
                .group_by(sale_item::Column::AccessoryId)
                .into_tuple::<(Uuid, i64)>()
                .all(conn)
                .await
                .map_err(ServiceError::db_error)?,
        );

        for a in accessory::Entity::find()
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
        {
            items_checked += 1;
            let expected = i64::from(a.initial_quantity)
                - leased.get(&a.id).copied().unwrap_or(0)
                - sold.get(&a.id).copied().unwrap_or(0);
            if expected != i64::from(a.quantity) {
                discrepancies.push(Discrepancy {
                    item_id: a.id,
                    kind: ItemKind::Accessory,
                    name: a.acc_name,
                    initial_quantity: a.initial_quantity,
                    quantity: a.quantity,
                    expected_quantity: expected,
                    difference: i64::from(a.quantity) - expected,
                });
            }
        }
    }

    Ok(ReconciliationReport {
        generated_at: Utc::now(),
        items_checked,
        discrepancies,
    })
}

/// Service wrapper used by the HTTP layer
#[derive(Clone)]
pub struct StockAggregator {
    db: Arc<DatabaseConnection>,
}

impl StockAggregator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn stock_view(&self, item: ItemRef) -> Result<StockView, ServiceError> {
        stock_view(&*self.db, item).await
    }

    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        kind: Option<ItemKind>,
    ) -> Result<ReconciliationReport, ServiceError> {
        let report = reconcile(&*self.db, kind).await?;
        if report.is_consistent() {
            info!(items = report.items_checked, "stock counters reconcile");
        } else {
            warn!(
                items = report.items_checked,
                discrepancies = report.discrepancies.len(),
                "stock counters disagree with demand records"
            );
        }
        Ok(report)
    }
}
