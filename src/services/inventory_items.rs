//! Stores, clients and inventory items outside the demand path.
//!
//! Intake sets `initial_quantity` once. Later updates touch descriptive
//! columns only; quantity belongs to the coordinator and status changes are
//! limited to manual holds. Deletes are refused while anything still points
//! at the row.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::demand_coordinator::validate_non_negative;
use super::stock_aggregator::{self, StockView};
use super::stock_ledger;
use crate::db::in_transaction;
use crate::entities::machine::{MachineCondition, MachineStatus};
use crate::entities::{
    accessory, call, client, lease_acc_inquiry, lease_contract, lease_part_inquiry, machine,
    meter_reading, part, sale, sale_item, store, store_inquiry, ItemRef, StockStatus,
};
use crate::errors::{is_foreign_key_violation, ServiceError};
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStoreRequest {
    #[validate(length(min = 1, max = 120))]
    pub store_name: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255))]
    pub client_name: String,
    #[validate(length(min = 1, max = 255))]
    pub client_location: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePartRequest {
    pub store_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub part_name: String,
    #[validate(length(min = 1, max = 120))]
    pub part_type: String,
    #[validate(length(min = 1, max = 120))]
    pub ref_no: String,
    #[validate(custom = "validate_non_negative")]
    pub unit_value: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default)]
    pub is_transfer: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccessoryRequest {
    pub store_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub acc_name: String,
    #[validate(length(min = 1, max = 120))]
    pub acc_type: String,
    #[validate(length(min = 1, max = 120))]
    pub ref_no: String,
    #[validate(custom = "validate_non_negative")]
    pub unit_value: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default)]
    pub is_transfer: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMachineRequest {
    pub store_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub machine_name: String,
    #[validate(length(min = 1, max = 120))]
    pub machine_type: String,
    #[validate(length(min = 1, max = 120))]
    pub serial_no: String,
    pub machine_condition: MachineCondition,
    #[validate(custom = "validate_non_negative")]
    pub unit_value: Decimal,
    #[serde(default)]
    pub is_transfer: bool,
}

/// Patch for a part or accessory. `name`/`item_type` map onto
/// `part_name`/`part_type` or `acc_name`/`acc_type`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStockItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub item_type: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub ref_no: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub unit_value: Option<Decimal>,
    pub store_id: Option<Uuid>,
    pub is_transfer: Option<bool>,
    pub status: Option<StockStatus>,
    /// Rejected when present
    pub quantity: Option<i32>,
    /// Rejected when present
    pub initial_quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMachineRequest {
    #[validate(length(min = 1, max = 255))]
    pub machine_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub machine_type: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub serial_no: Option<String>,
    pub machine_condition: Option<MachineCondition>,
    #[validate(custom = "validate_non_negative")]
    pub unit_value: Option<Decimal>,
    pub store_id: Option<Uuid>,
    pub is_transfer: Option<bool>,
    pub status: Option<MachineStatus>,
    /// Rejected when present
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartDetail {
    #[serde(flatten)]
    pub part: part::Model,
    pub stock: StockView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessoryDetail {
    #[serde(flatten)]
    pub accessory: accessory::Model,
    pub stock: StockView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MachineDetail {
    #[serde(flatten)]
    pub machine: machine::Model,
    /// Active lease holding the machine, if any
    pub active_lease_id: Option<Uuid>,
    /// Sale line that sold the machine, if any
    pub sale_item_id: Option<Uuid>,
}

fn reject_counter_patch(quantity: Option<i32>, initial: Option<i32>) -> Result<(), ServiceError> {
    if quantity.is_some() {
        return Err(ServiceError::ValidationError(
            "quantity is maintained by sales and leases and cannot be edited".to_string(),
        ));
    }
    if initial.is_some() {
        return Err(ServiceError::ValidationError(
            "initial_quantity is fixed at intake and cannot be edited".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn duplicate(what: &str, value: &str) -> impl FnOnce(DbErr) -> ServiceError {
    let message = format!("{} {} already exists", what, value);
    move |err| {
        if crate::errors::is_unique_violation(&err) {
            ServiceError::Conflict(message)
        } else {
            ServiceError::db_error(err)
        }
    }
}

pub(crate) fn referenced_by(what: String, refs: &[(u64, &str)]) -> Result<(), ServiceError> {
    let parts: Vec<String> = refs
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();
    if parts.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ReferenceIntegrity(format!(
            "Cannot delete {}: still referenced by {}",
            what,
            parts.join(", ")
        )))
    }
}

pub(crate) fn delete_error(what: String) -> impl FnOnce(DbErr) -> ServiceError {
    move |err| {
        if is_foreign_key_violation(&err) {
            ServiceError::ReferenceIntegrity(format!("Cannot delete {}: it is still referenced", what))
        } else {
            ServiceError::db_error(err)
        }
    }
}

#[derive(Clone)]
pub struct InventoryItemService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryItemService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    // -- stores -------------------------------------------------------------

    #[instrument(skip(self, req))]
    pub async fn create_store(&self, req: CreateStoreRequest) -> Result<store::Model, ServiceError> {
        req.validate()?;
        let model = store::ActiveModel {
            store_name: Set(req.store_name.clone()),
            location: Set(req.location),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(duplicate("Store", &req.store_name))?;
        info!(store_id = %model.id, "store created");
        Ok(model)
    }

    pub async fn list_stores(&self) -> Result<Vec<store::Model>, ServiceError> {
        store::Entity::find()
            .order_by_asc(store::Column::StoreName)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_store(&self, id: Uuid) -> Result<store::Model, ServiceError> {
        store::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn delete_store(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_store(id).await?;
        let db = &*self.db;
        let refs = [
            (
                machine::Entity::find()
                    .filter(machine::Column::StoreId.eq(id))
                    .count(db)
                    .await?,
                "machine(s)",
            ),
            (
                part::Entity::find()
                    .filter(part::Column::StoreId.eq(id))
                    .count(db)
                    .await?,
                "part(s)",
            ),
            (
                accessory::Entity::find()
                    .filter(accessory::Column::StoreId.eq(id))
                    .count(db)
                    .await?,
                "accessory line(s)",
            ),
            (
                lease_contract::Entity::find()
                    .filter(lease_contract::Column::StoreId.eq(id))
                    .count(db)
                    .await?,
                "lease contract(s)",
            ),
        ];
        let what = format!("store {}", existing.store_name);
        referenced_by(what.clone(), &refs)?;

        store::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(delete_error(what))?;
        info!(store_id = %id, "store deleted");
        Ok(())
    }

    // -- clients ------------------------------------------------------------

    #[instrument(skip(self, req))]
    pub async fn create_client(
        &self,
        req: CreateClientRequest,
    ) -> Result<client::Model, ServiceError> {
        req.validate()?;
        let model = client::ActiveModel {
            client_name: Set(req.client_name),
            client_location: Set(req.client_location),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::db_error)?;
        info!(client_id = %model.id, "client created");
        Ok(model)
    }

    pub async fn list_clients(&self) -> Result<Vec<client::Model>, ServiceError> {
        client::Entity::find()
            .order_by_asc(client::Column::ClientName)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_client(&self, id: Uuid) -> Result<client::Model, ServiceError> {
        client::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn delete_client(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_client(id).await?;
        let db = &*self.db;
        let refs = [
            (
                sale::Entity::find()
                    .filter(sale::Column::ClientId.eq(id))
                    .count(db)
                    .await?,
                "sale(s)",
            ),
            (
                lease_contract::Entity::find()
                    .filter(lease_contract::Column::ClientId.eq(id))
                    .count(db)
                    .await?,
                "lease contract(s)",
            ),
            (
                call::Entity::find()
                    .filter(call::Column::ClientId.eq(id))
                    .count(db)
                    .await?,
                "call(s)",
            ),
        ];
        let what = format!("client {}", existing.client_name);
        referenced_by(what.clone(), &refs)?;

        client::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(delete_error(what))?;
        info!(client_id = %id, "client deleted");
        Ok(())
    }

    // -- parts --------------------------------------------------------------

    #[instrument(skip(self, req), fields(ref_no = %req.ref_no))]
    pub async fn create_part(&self, req: CreatePartRequest) -> Result<PartDetail, ServiceError> {
        req.validate()?;
        self.get_store(req.store_id).await?;
        let model = part::ActiveModel {
            store_id: Set(req.store_id),
            part_name: Set(req.part_name),
            part_type: Set(req.part_type),
            ref_no: Set(req.ref_no.clone()),
            unit_value: Set(req.unit_value),
            initial_quantity: Set(req.quantity),
            quantity: Set(req.quantity),
            status: Set(StockStatus::for_intake(req.quantity).as_str().to_string()),
            is_transfer: Set(req.is_transfer),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(duplicate("Part with ref_no", &req.ref_no))?;
        info!(part_id = %model.id, quantity = model.quantity, "part received");
        self.get_part(model.id).await
    }

    pub async fn get_part(&self, id: Uuid) -> Result<PartDetail, ServiceError> {
        let part = self.find_part(id).await?;
        let stock = stock_aggregator::stock_view(&*self.db, ItemRef::part(id)).await?;
        Ok(PartDetail { part, stock })
    }

    #[instrument(skip(self, req))]
    pub async fn update_part(
        &self,
        id: Uuid,
        req: UpdateStockItemRequest,
    ) -> Result<PartDetail, ServiceError> {
        req.validate()?;
        reject_counter_patch(req.quantity, req.initial_quantity)?;
        let existing = self.find_part(id).await?;
        if let Some(store_id) = req.store_id {
            self.get_store(store_id).await?;
        }

        let mut active: part::ActiveModel = existing.clone().into();
        if let Some(name) = req.name {
            active.part_name = Set(name);
        }
        if let Some(item_type) = req.item_type {
            active.part_type = Set(item_type);
        }
        if let Some(ref_no) = &req.ref_no {
            active.ref_no = Set(ref_no.clone());
        }
        if let Some(unit_value) = req.unit_value {
            active.unit_value = Set(unit_value);
        }
        if let Some(store_id) = req.store_id {
            active.store_id = Set(store_id);
        }
        if let Some(is_transfer) = req.is_transfer {
            active.is_transfer = Set(is_transfer);
        }
        // Stale counters from `existing` must not be written back
        active.quantity = sea_orm::ActiveValue::NotSet;
        active.status = sea_orm::ActiveValue::NotSet;
        let on_duplicate = duplicate("Part with ref_no", req.ref_no.as_deref().unwrap_or(""));
        let hold = req.status.map(|to| (existing.status, to));
        in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                if let Some((from, to)) = hold {
                    stock_ledger::set_manual_status(txn, ItemRef::part(id), &from, to.as_str())
                        .await?;
                }
                active.update(txn).await.map_err(on_duplicate)?;
                Ok(())
            })
        })
        .await?;

        self.get_part(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_part(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_part(id).await?;
        let db = &*self.db;
        let refs = [
            (
                sale_item::Entity::find()
                    .filter(sale_item::Column::PartId.eq(id))
                    .count(db)
                    .await?,
                "sale item(s)",
            ),
            (
                lease_part_inquiry::Entity::find()
                    .filter(lease_part_inquiry::Column::PartId.eq(id))
                    .count(db)
                    .await?,
                "lease part inquiry(ies)",
            ),
            (
                store_inquiry::Entity::find()
                    .filter(store_inquiry::Column::PartId.eq(id))
                    .count(db)
                    .await?,
                "store inquiry(ies)",
            ),
        ];
        let what = format!("part {}", existing.ref_no);
        referenced_by(what.clone(), &refs)?;

        part::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(delete_error(what))?;
        info!(part_id = %id, "part deleted");
        Ok(())
    }

    async fn find_part(&self, id: Uuid) -> Result<part::Model, ServiceError> {
        part::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Part {} not found", id)))
    }

    // -- accessories --------------------------------------------------------

    #[instrument(skip(self, req), fields(ref_no = %req.ref_no))]
    pub async fn create_accessory(
        &self,
        req: CreateAccessoryRequest,
    ) -> Result<AccessoryDetail, ServiceError> {
        req.validate()?;
        self.get_store(req.store_id).await?;
        let model = accessory::ActiveModel {
            store_id: Set(req.store_id),
            acc_name: Set(req.acc_name),
            acc_type: Set(req.acc_type),
            ref_no: Set(req.ref_no.clone()),
            unit_value: Set(req.unit_value),
            initial_quantity: Set(req.quantity),
            quantity: Set(req.quantity),
            status: Set(StockStatus::for_intake(req.quantity).as_str().to_string()),
            is_transfer: Set(req.is_transfer),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(duplicate("Accessory with ref_no", &req.ref_no))?;
        info!(accessory_id = %model.id, quantity = model.quantity, "accessory received");
        self.get_accessory(model.id).await
    }

    pub async fn get_accessory(&self, id: Uuid) -> Result<AccessoryDetail, ServiceError> {
        let accessory = self.find_accessory(id).await?;
        let stock = stock_aggregator::stock_view(&*self.db, ItemRef::accessory(id)).await?;
        Ok(AccessoryDetail { accessory, stock })
    }

    #[instrument(skip(self, req))]
    pub async fn update_accessory(
        &self,
        id: Uuid,
        req: UpdateStockItemRequest,
    ) -> Result<AccessoryDetail, ServiceError> {
        req.validate()?;
        reject_counter_patch(req.quantity, req.initial_quantity)?;
        let existing = self.find_accessory(id).await?;
        if let Some(store_id) = req.store_id {
            self.get_store(store_id).await?;
        }

        let mut active: accessory::ActiveModel = existing.clone().into();
        if let Some(name) = req.name {
            active.acc_name = Set(name);
        }
        if let Some(item_type) = req.item_type {
            active.acc_type = Set(item_type);
        }
        if let Some(ref_no) = &req.ref_no {
            active.ref_no = Set(ref_no.clone());
        }
        if let Some(unit_value) = req.unit_value {
            active.unit_value = Set(unit_value);
        }
        if let Some(store_id) = req.store_id {
            active.store_id = Set(store_id);
        }
        if let Some(is_transfer) = req.is_transfer {
            active.is_transfer = Set(is_transfer);
        }
        active.quantity = sea_orm::ActiveValue::NotSet;
        active.status = sea_orm::ActiveValue::NotSet;
        let on_duplicate = duplicate("Accessory with ref_no", req.ref_no.as_deref().unwrap_or(""));
        let hold = req.status.map(|to| (existing.status, to));
        in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                if let Some((from, to)) = hold {
                    stock_ledger::set_manual_status(txn, ItemRef::accessory(id), &from, to.as_str())
                        .await?;
                }
                active.update(txn).await.map_err(on_duplicate)?;
                Ok(())
            })
        })
        .await?;

        self.get_accessory(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_accessory(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_accessory(id).await?;
        let db = &*self.db;
        let refs = [
            (
                sale_item::Entity::find()
                    .filter(sale_item::Column::AccessoryId.eq(id))
                    .count(db)
                    .await?,
                "sale item(s)",
            ),
            (
                lease_acc_inquiry::Entity::find()
                    .filter(lease_acc_inquiry::Column::AccessoryId.eq(id))
                    .count(db)
                    .await?,
                "lease accessory inquiry(ies)",
            ),
        ];
        let what = format!("accessory {}", existing.ref_no);
        referenced_by(what.clone(), &refs)?;

        accessory::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(delete_error(what))?;
        info!(accessory_id = %id, "accessory deleted");
        Ok(())
    }

    async fn find_accessory(&self, id: Uuid) -> Result<accessory::Model, ServiceError> {
        accessory::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Accessory {} not found", id)))
    }

    // -- machines -----------------------------------------------------------

    #[instrument(skip(self, req), fields(serial_no = %req.serial_no))]
    pub async fn create_machine(
        &self,
        req: CreateMachineRequest,
    ) -> Result<MachineDetail, ServiceError> {
        req.validate()?;
        self.get_store(req.store_id).await?;
        let model = machine::ActiveModel {
            store_id: Set(req.store_id),
            machine_name: Set(req.machine_name),
            machine_type: Set(req.machine_type),
            serial_no: Set(req.serial_no.clone()),
            machine_condition: Set(req.machine_condition.as_str().to_string()),
            unit_value: Set(req.unit_value),
            quantity: Set(1),
            status: Set(MachineStatus::Available.as_str().to_string()),
            is_transfer: Set(req.is_transfer),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(duplicate("Machine with serial_no", &req.serial_no))?;
        info!(machine_id = %model.id, "machine received");
        self.get_machine(model.id).await
    }

    pub async fn get_machine(&self, id: Uuid) -> Result<MachineDetail, ServiceError> {
        let machine = self.find_machine(id).await?;
        let db = &*self.db;
        let active_lease_id = lease_contract::Entity::find()
            .filter(lease_contract::Column::ItemId.eq(id))
            .filter(lease_contract::Column::IsActive.eq(true))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .map(|l| l.id);
        let sale_item_id = sale_item::Entity::find()
            .filter(sale_item::Column::MachineId.eq(id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .map(|s| s.id);
        Ok(MachineDetail {
            machine,
            active_lease_id,
            sale_item_id,
        })
    }

    #[instrument(skip(self, req))]
    pub async fn update_machine(
        &self,
        id: Uuid,
        req: UpdateMachineRequest,
    ) -> Result<MachineDetail, ServiceError> {
        req.validate()?;
        reject_counter_patch(req.quantity, None)?;
        let existing = self.find_machine(id).await?;
        if let Some(store_id) = req.store_id {
            self.get_store(store_id).await?;
        }

        let mut active: machine::ActiveModel = existing.clone().into();
        if let Some(name) = req.machine_name {
            active.machine_name = Set(name);
        }
        if let Some(machine_type) = req.machine_type {
            active.machine_type = Set(machine_type);
        }
        if let Some(serial_no) = &req.serial_no {
            active.serial_no = Set(serial_no.clone());
        }
        if let Some(condition) = req.machine_condition {
            active.machine_condition = Set(condition.as_str().to_string());
        }
        if let Some(unit_value) = req.unit_value {
            active.unit_value = Set(unit_value);
        }
        if let Some(store_id) = req.store_id {
            active.store_id = Set(store_id);
        }
        if let Some(is_transfer) = req.is_transfer {
            active.is_transfer = Set(is_transfer);
        }
        active.quantity = sea_orm::ActiveValue::NotSet;
        active.status = sea_orm::ActiveValue::NotSet;
        let on_duplicate = duplicate("Machine with serial_no", req.serial_no.as_deref().unwrap_or(""));
        let from = existing.status.clone();
        let target = req.status;
        let level = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let level = match target {
                    Some(to) => Some(
                        stock_ledger::set_manual_status(txn, ItemRef::machine(id), &from, to.as_str())
                            .await?,
                    ),
                    None => None,
                };
                active.update(txn).await.map_err(on_duplicate)?;
                Ok(level)
            })
        })
        .await?;

        if let Some(level) = level.filter(|l| l.status != existing.status) {
            self.event_sender
                .send_or_log(Event::MachineStatusChanged {
                    machine_id: id,
                    from: existing.status.clone(),
                    to: level.status,
                })
                .await;
        }

        self.get_machine(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_machine(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_machine(id).await?;
        let db = &*self.db;
        let refs = [
            (
                sale_item::Entity::find()
                    .filter(sale_item::Column::MachineId.eq(id))
                    .count(db)
                    .await?,
                "sale item(s)",
            ),
            (
                lease_contract::Entity::find()
                    .filter(lease_contract::Column::ItemId.eq(id))
                    .count(db)
                    .await?,
                "lease contract(s)",
            ),
            (
                call::Entity::find()
                    .filter(call::Column::ItemId.eq(id))
                    .count(db)
                    .await?,
                "call(s)",
            ),
            (
                meter_reading::Entity::find()
                    .filter(meter_reading::Column::MachineId.eq(id))
                    .count(db)
                    .await?,
                "meter reading(s)",
            ),
        ];
        let what = format!("machine {}", existing.serial_no);
        referenced_by(what.clone(), &refs)?;

        machine::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(delete_error(what))?;
        info!(machine_id = %id, "machine deleted");
        Ok(())
    }

    async fn find_machine(&self, id: Uuid) -> Result<machine::Model, ServiceError> {
        machine::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Machine {} not found", id)))
    }
}
