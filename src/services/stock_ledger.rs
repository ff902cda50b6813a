//! The only code that writes inventory `quantity` and `status` columns.
//!
//! Every primitive runs on the caller's connection, normally an open
//! transaction, so the stock change commits or rolls back together with the
//! demand record that caused it. Sufficiency check and decrement are one
//! conditional `UPDATE`, which serialises concurrent demands on the row.

use chrono::Utc;
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::machine::{self, MachineStatus};
use crate::entities::{accessory, part, ItemKind, ItemRef, StockStatus};
use crate::errors::ServiceError;

/// Quantity and status of one inventory row after a stock operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockLevel {
    pub item_id: Uuid,
    pub kind: ItemKind,
    pub quantity: i32,
    pub status: String,
}

/// Which wording to use when a decrement is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortfall {
    /// A new demand record
    Create,
    /// An existing record whose quantity grows
    Increase,
}

impl Shortfall {
    pub fn message(&self, available: i32) -> String {
        match self {
            Shortfall::Create => {
                format!("Insufficient stock. Only {} units available.", available)
            }
            Shortfall::Increase => format!(
                "Insufficient stock for increase. Only {} additional units available.",
                available
            ),
        }
    }
}

/// Inventory tables that hold a divisible on-hand counter
pub trait Stocked: EntityTrait {
    const KIND: ItemKind;

    fn id_column() -> Self::Column;
    fn quantity_column() -> Self::Column;
    fn status_column() -> Self::Column;
    fn updated_at_column() -> Self::Column;
}

impl Stocked for part::Entity {
    const KIND: ItemKind = ItemKind::Part;

    fn id_column() -> Self::Column {
        part::Column::Id
    }
    fn quantity_column() -> Self::Column {
        part::Column::Quantity
    }
    fn status_column() -> Self::Column {
        part::Column::Status
    }
    fn updated_at_column() -> Self::Column {
        part::Column::UpdatedAt
    }
}

impl Stocked for accessory::Entity {
    const KIND: ItemKind = ItemKind::Accessory;

    fn id_column() -> Self::Column {
        accessory::Column::Id
    }
    fn quantity_column() -> Self::Column {
        accessory::Column::Quantity
    }
    fn status_column() -> Self::Column {
        accessory::Column::Status
    }
    fn updated_at_column() -> Self::Column {
        accessory::Column::UpdatedAt
    }
}

/// Decrements a part or accessory by `n`, refusing to go below zero.
pub async fn take<C>(
    conn: &C,
    item: ItemRef,
    n: i32,
    shortfall: Shortfall,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    match item.kind {
        ItemKind::Part => take_from::<part::Entity, C>(conn, item.id, n, shortfall).await,
        ItemKind::Accessory => {
            take_from::<accessory::Entity, C>(conn, item.id, n, shortfall).await
        }
        ItemKind::Machine => Err(ServiceError::ValidationError(
            "Machines are claimed by status, not decremented".to_string(),
        )),
    }
}

/// Adds `n` back to a part or accessory.
pub async fn restore<C>(conn: &C, item: ItemRef, n: i32) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    match item.kind {
        ItemKind::Part => restore_to::<part::Entity, C>(conn, item.id, n).await,
        ItemKind::Accessory => restore_to::<accessory::Entity, C>(conn, item.id, n).await,
        ItemKind::Machine => Err(ServiceError::ValidationError(
            "Machines are released by status, not incremented".to_string(),
        )),
    }
}

async fn take_from<E, C>(
    conn: &C,
    id: Uuid,
    n: i32,
    shortfall: Shortfall,
) -> Result<StockLevel, ServiceError>
where
    E: Stocked,
    C: ConnectionTrait,
{
    if n <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let result = E::update_many()
        .col_expr(
            E::quantity_column(),
            Expr::col(E::quantity_column()).sub(n),
        )
        .col_expr(E::updated_at_column(), Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .filter(E::quantity_column().gte(n))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        let available = current_quantity::<E, C>(conn, id).await?;
        return match available {
            None => Err(not_found(E::KIND, id)),
            Some(q) => {
                counter!("bititec_stock.insufficient", 1);
                debug!(kind = %E::KIND, item_id = %id, requested = n, available = q, "stock take refused");
                Err(ServiceError::InsufficientStock(shortfall.message(q)))
            }
        };
    }

    mark_out_of_stock_at_zero::<E, C>(conn, id).await?;

    counter!("bititec_stock.taken", n as u64);
    level_of::<E, C>(conn, id).await
}

/// `Available` at zero becomes `Out of Stock`. Manual holds (Reserved,
/// Maintenance) stay in place.
async fn mark_out_of_stock_at_zero<E, C>(conn: &C, id: Uuid) -> Result<(), ServiceError>
where
    E: Stocked,
    C: ConnectionTrait,
{
    E::update_many()
        .col_expr(
            E::status_column(),
            Expr::value(StockStatus::OutOfStock.as_str()),
        )
        .filter(E::id_column().eq(id))
        .filter(E::status_column().eq(StockStatus::Available.as_str()))
        .filter(E::quantity_column().lte(0))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

async fn restore_to<E, C>(conn: &C, id: Uuid, n: i32) -> Result<StockLevel, ServiceError>
where
    E: Stocked,
    C: ConnectionTrait,
{
    if n <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let result = E::update_many()
        .col_expr(
            E::quantity_column(),
            Expr::col(E::quantity_column()).add(n),
        )
        .col_expr(E::updated_at_column(), Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(not_found(E::KIND, id));
    }

    // Manual holds (Reserved, Maintenance) survive a restore
    E::update_many()
        .col_expr(
            E::status_column(),
            Expr::value(StockStatus::Available.as_str()),
        )
        .filter(E::id_column().eq(id))
        .filter(E::status_column().eq(StockStatus::OutOfStock.as_str()))
        .filter(E::quantity_column().gt(0))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    counter!("bititec_stock.restored", n as u64);
    level_of::<E, C>(conn, id).await
}

async fn current_quantity<E, C>(conn: &C, id: Uuid) -> Result<Option<i32>, ServiceError>
where
    E: Stocked,
    C: ConnectionTrait,
{
    E::find()
        .select_only()
        .column(E::quantity_column())
        .filter(E::id_column().eq(id))
        .into_tuple::<i32>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn level_of<E, C>(conn: &C, id: Uuid) -> Result<StockLevel, ServiceError>
where
    E: Stocked,
    C: ConnectionTrait,
{
    let (quantity, status) = E::find()
        .select_only()
        .column(E::quantity_column())
        .column(E::status_column())
        .filter(E::id_column().eq(id))
        .into_tuple::<(i32, String)>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| not_found(E::KIND, id))?;

    Ok(StockLevel {
        item_id: id,
        kind: E::KIND,
        quantity,
        status,
    })
}

/// Reads the current quantity and status of any inventory row.
pub async fn stock_level<C>(conn: &C, item: ItemRef) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    match item.kind {
        ItemKind::Part => level_of::<part::Entity, C>(conn, item.id).await,
        ItemKind::Accessory => level_of::<accessory::Entity, C>(conn, item.id).await,
        ItemKind::Machine => machine_level(conn, item.id).await,
    }
}

/// Statuses a user may set by hand; the rest belong to the coordinator
pub fn manual_transition_allowed(from: &str, to: &str) -> bool {
    const AVAILABLE: &str = "Available";
    const HOLDS: [&str; 2] = ["Maintenance", "Reserved"];
    from == to
        || (from == AVAILABLE && HOLDS.contains(&to))
        || (HOLDS.contains(&from) && to == AVAILABLE)
}

/// Applies a manual hold or release, guarded on the status the caller saw.
pub async fn set_manual_status<C>(
    conn: &C,
    item: ItemRef,
    from: &str,
    to: &str,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    if !manual_transition_allowed(from, to) {
        return Err(ServiceError::ValidationError(format!(
            "Status cannot be changed from {} to {} by hand",
            from, to
        )));
    }
    if from == to {
        return stock_level(conn, item).await;
    }

    let rows = match item.kind {
        ItemKind::Part => guarded_status::<part::Entity, C>(conn, item.id, from, to).await?,
        ItemKind::Accessory => {
            guarded_status::<accessory::Entity, C>(conn, item.id, from, to).await?
        }
        ItemKind::Machine => machine::Entity::update_many()
            .col_expr(machine::Column::Status, Expr::value(to))
            .col_expr(machine::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(machine::Column::Id.eq(item.id))
            .filter(machine::Column::Status.eq(from))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?
            .rows_affected,
    };

    if rows == 0 {
        return Err(ServiceError::Conflict(format!(
            "{} status changed concurrently; expected {}",
            item, from
        )));
    }
    stock_level(conn, item).await
}

async fn guarded_status<E, C>(conn: &C, id: Uuid, from: &str, to: &str) -> Result<u64, ServiceError>
where
    E: Stocked,
    C: ConnectionTrait,
{
    let rows = E::update_many()
        .col_expr(E::status_column(), Expr::value(to))
        .col_expr(E::updated_at_column(), Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .filter(E::status_column().eq(from))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?
        .rows_affected;
    // A hold released on an empty line
    mark_out_of_stock_at_zero::<E, C>(conn, id).await?;
    Ok(rows)
}

/// Moves an `Available` machine to `target` (Sold or Leased).
pub async fn claim_machine<C>(
    conn: &C,
    machine_id: Uuid,
    target: MachineStatus,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let result = machine::Entity::update_many()
        .col_expr(machine::Column::Status, Expr::value(target.as_str()))
        .col_expr(machine::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(machine::Column::Id.eq(machine_id))
        .filter(machine::Column::Status.eq(MachineStatus::Available.as_str()))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        let current = machine::Entity::find()
            .select_only()
            .column(machine::Column::SerialNo)
            .column(machine::Column::Status)
            .filter(machine::Column::Id.eq(machine_id))
            .into_tuple::<(String, String)>()
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?;

        return match current {
            None => Err(not_found(ItemKind::Machine, machine_id)),
            Some((serial_no, status)) => Err(ServiceError::InsufficientStock(format!(
                "Machine {} is not available (status: {}).",
                serial_no, status
            ))),
        };
    }

    machine_level(conn, machine_id).await
}

/// Returns a machine in status `from` to `Available`. A machine that has
/// meanwhile been moved elsewhere by hand is left as it is.
pub async fn release_machine<C>(
    conn: &C,
    machine_id: Uuid,
    from: MachineStatus,
) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let result = machine::Entity::update_many()
        .col_expr(
            machine::Column::Status,
            Expr::value(MachineStatus::Available.as_str()),
        )
        .col_expr(machine::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(machine::Column::Id.eq(machine_id))
        .filter(machine::Column::Status.eq(from.as_str()))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        warn!(%machine_id, expected = from.as_str(), "machine release matched no row");
    }

    machine_level(conn, machine_id).await
}

async fn machine_level<C>(conn: &C, machine_id: Uuid) -> Result<StockLevel, ServiceError>
where
    C: ConnectionTrait,
{
    let (quantity, status) = machine::Entity::find()
        .select_only()
        .column(machine::Column::Quantity)
        .column(machine::Column::Status)
        .filter(machine::Column::Id.eq(machine_id))
        .into_tuple::<(i32, String)>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| not_found(ItemKind::Machine, machine_id))?;

    Ok(StockLevel {
        item_id: machine_id,
        kind: ItemKind::Machine,
        quantity,
        status,
    })
}

pub(crate) fn not_found(kind: ItemKind, id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{} {} not found", kind, id))
}
