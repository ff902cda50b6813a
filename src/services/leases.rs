//! Lease, rental and maintenance contracts.
//!
//! An active contract holds its machine in `Leased`. Closing or deleting the
//! contract releases the machine; deleting it also routes the part and
//! accessory inquiries under it through the coordinator so their stock
//! comes back.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::demand_coordinator::{
    delete_lease_acc_inquiry_in, delete_lease_part_inquiry_in, parent_delete_error,
};
use super::document_numbers::{insert_numbered, DocumentPrefix};
use super::stock_ledger::{self, StockLevel};
use crate::db::in_transaction;
use crate::entities::lease_contract::LeaseContractType;
use crate::entities::machine::MachineStatus;
use crate::entities::{
    client, delivery, lease_acc_inquiry, lease_contract, lease_part_inquiry, machine,
    meter_reading, store,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLeaseRequest {
    /// Preset lease number; generated when absent
    pub lease_no: Option<String>,
    pub client_id: Uuid,
    pub department: Option<String>,
    /// The leased machine
    pub item_id: Uuid,
    pub store_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[serde(default)]
    pub add_vat: bool,
    #[serde(default)]
    pub add_myq: bool,
    #[serde(default)]
    pub billed_myq: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub contract_type: LeaseContractType,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLeaseRequest {
    pub department: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub add_vat: Option<bool>,
    pub add_myq: Option<bool>,
    pub billed_myq: Option<bool>,
    pub is_active: Option<bool>,
    pub contract_type: Option<LeaseContractType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaseDetail {
    #[serde(flatten)]
    pub lease: lease_contract::Model,
    pub part_inquiries: Vec<lease_part_inquiry::Model>,
    pub acc_inquiries: Vec<lease_acc_inquiry::Model>,
}

fn check_period(from: NaiveDate, to: NaiveDate) -> Result<(), ServiceError> {
    if from > to {
        return Err(ServiceError::ValidationError(
            "from_date must not be after to_date".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Months from `from` through `min(today, to)` with no entry in `recorded`,
/// formatted `YYYY-MM`.
pub fn missing_months(
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
    recorded: &[NaiveDate],
) -> Vec<String> {
    let seen: BTreeSet<NaiveDate> = recorded.iter().copied().map(first_of_month).collect();
    let last = first_of_month(to.min(today));
    let mut cursor = Some(first_of_month(from));
    let mut missing = Vec::new();
    while let Some(month) = cursor {
        if month > last {
            break;
        }
        if !seen.contains(&month) {
            missing.push(month.format("%Y-%m").to_string());
        }
        cursor = next_month(month);
    }
    missing
}

#[derive(Clone)]
pub struct LeaseService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    numbering_attempts: u32,
}

impl LeaseService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, numbering_attempts: u32) -> Self {
        Self {
            db,
            event_sender,
            numbering_attempts,
        }
    }

    #[instrument(skip(self, req), fields(machine_id = %req.item_id))]
    pub async fn create(&self, req: CreateLeaseRequest) -> Result<LeaseDetail, ServiceError> {
        req.validate()?;
        check_period(req.from_date, req.to_date)?;
        self.require_references(req.client_id, req.store_id, req.item_id).await?;

        let is_active = req.is_active;
        let machine_id = req.item_id;
        let template = lease_contract::ActiveModel {
            client_id: Set(req.client_id),
            department: Set(req.department),
            item_id: Set(req.item_id),
            store_id: Set(req.store_id),
            from_date: Set(req.from_date),
            to_date: Set(req.to_date),
            add_vat: Set(req.add_vat),
            add_myq: Set(req.add_myq),
            billed_myq: Set(req.billed_myq),
            is_active: Set(req.is_active),
            contract_type: Set(req.contract_type.as_str().to_string()),
            ..Default::default()
        };

        let (lease, events) = insert_numbered(
            DocumentPrefix::Lease,
            req.lease_no,
            self.numbering_attempts,
            |number| {
                let db = self.db.clone();
                let mut model = template.clone();
                model.lease_no = Set(number);
                async move {
                    in_transaction(&db, move |txn| {
                        Box::pin(async move {
                            let mut events = Vec::new();
                            if is_active {
                                stock_ledger::claim_machine(txn, machine_id, MachineStatus::Leased)
                                    .await?;
                                events.push(Event::MachineStatusChanged {
                                    machine_id,
                                    from: MachineStatus::Available.as_str().to_string(),
                                    to: MachineStatus::Leased.as_str().to_string(),
                                });
                            }
                            let lease = model.insert(txn).await.map_err(ServiceError::db_error)?;
                            events.push(Event::LeaseCreated {
                                lease_id: lease.id,
                                lease_no: lease.lease_no.clone(),
                            });
                            Ok((lease, events))
                        })
                    })
                    .await
                }
            },
        )
        .await?;

        info!(lease_id = %lease.id, lease_no = %lease.lease_no, "lease created");
        self.event_sender.send_all(events).await;
        Ok(LeaseDetail {
            lease,
            part_inquiries: Vec::new(),
            acc_inquiries: Vec::new(),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<LeaseDetail, ServiceError> {
        let lease = self.find(id).await?;
        let db = &*self.db;
        let part_inquiries = lease_part_inquiry::Entity::find()
            .filter(lease_part_inquiry::Column::LeaseId.eq(id))
            .order_by_asc(lease_part_inquiry::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let acc_inquiries = lease_acc_inquiry::Entity::find()
            .filter(lease_acc_inquiry::Column::LeaseId.eq(id))
            .order_by_asc(lease_acc_inquiry::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(LeaseDetail {
            lease,
            part_inquiries,
            acc_inquiries,
        })
    }

    pub async fn list(
        &self,
        active_only: bool,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<lease_contract::Model>, ServiceError> {
        let mut query = lease_contract::Entity::find();
        if active_only {
            query = query.filter(lease_contract::Column::IsActive.eq(true));
        }
        query
            .order_by_desc(lease_contract::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Edits contract terms. Toggling `is_active` claims or releases the
    /// machine in the same transaction.
    #[instrument(skip(self, req))]
    pub async fn update(&self, id: Uuid, req: UpdateLeaseRequest) -> Result<LeaseDetail, ServiceError> {
        req.validate()?;
        let existing = self.find(id).await?;
        check_period(
            req.from_date.unwrap_or(existing.from_date),
            req.to_date.unwrap_or(existing.to_date),
        )?;

        let was_active = existing.is_active;
        let now_active = req.is_active.unwrap_or(was_active);
        let machine_id = existing.item_id;

        let mut active: lease_contract::ActiveModel = existing.into();
        if let Some(department) = req.department {
            active.department = Set(Some(department));
        }
        if let Some(from_date) = req.from_date {
            active.from_date = Set(from_date);
        }
        if let Some(to_date) = req.to_date {
            active.to_date = Set(to_date);
        }
        if let Some(add_vat) = req.add_vat {
            active.add_vat = Set(add_vat);
        }
        if let Some(add_myq) = req.add_myq {
            active.add_myq = Set(add_myq);
        }
        if let Some(billed_myq) = req.billed_myq {
            active.billed_myq = Set(billed_myq);
        }
        if let Some(contract_type) = req.contract_type {
            active.contract_type = Set(contract_type.as_str().to_string());
        }
        active.is_active = Set(now_active);

        let events = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                if was_active != now_active {
                    let flipped = lease_contract::Entity::update_many()
                        .col_expr(lease_contract::Column::IsActive, Expr::value(now_active))
                        .filter(lease_contract::Column::Id.eq(id))
                        .filter(lease_contract::Column::IsActive.eq(was_active))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if flipped.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Lease contract {} was changed by another request; reload and retry",
                            id
                        )));
                    }

                    if now_active {
                        stock_ledger::claim_machine(txn, machine_id, MachineStatus::Leased).await?;
                        events.push(Event::MachineStatusChanged {
                            machine_id,
                            from: MachineStatus::Available.as_str().to_string(),
                            to: MachineStatus::Leased.as_str().to_string(),
                        });
                    } else {
                        let level =
                            stock_ledger::release_machine(txn, machine_id, MachineStatus::Leased)
                                .await?;
                        events.push(Event::MachineStatusChanged {
                            machine_id,
                            from: MachineStatus::Leased.as_str().to_string(),
                            to: level.status,
                        });
                        events.push(Event::LeaseClosed(id));
                    }
                }
                active.update(txn).await.map_err(ServiceError::db_error)?;
                Ok(events)
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        self.get(id).await
    }

    /// Deletes the contract with its inquiries and meter readings. Refused
    /// while a delivery points at it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<Vec<StockLevel>, ServiceError> {
        let detail = self.get(id).await?;
        let deliveries = delivery::Entity::find()
            .filter(delivery::Column::LeaseId.eq(id))
            .count(&*self.db)
            .await?;
        if deliveries > 0 {
            return Err(ServiceError::ReferenceIntegrity(format!(
                "Cannot delete lease {}: still referenced by {} delivery(ies)",
                detail.lease.lease_no, deliveries
            )));
        }

        let (levels, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let LeaseDetail {
                    lease,
                    part_inquiries,
                    acc_inquiries,
                } = detail;
                let mut events = Vec::new();
                let mut levels = Vec::new();

                for record in &part_inquiries {
                    levels.push(delete_lease_part_inquiry_in(txn, record, &mut events).await?);
                }
                for record in &acc_inquiries {
                    levels.push(delete_lease_acc_inquiry_in(txn, record, &mut events).await?);
                }
                meter_reading::Entity::delete_many()
                    .filter(meter_reading::Column::LeaseId.eq(lease.id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if lease.is_active {
                    let level =
                        stock_ledger::release_machine(txn, lease.item_id, MachineStatus::Leased)
                            .await?;
                    events.push(Event::MachineStatusChanged {
                        machine_id: lease.item_id,
                        from: MachineStatus::Leased.as_str().to_string(),
                        to: level.status.clone(),
                    });
                }
                lease_contract::Entity::delete_by_id(lease.id)
                    .exec(txn)
                    .await
                    .map_err(parent_delete_error(format!("Lease {}", lease.lease_no)))?;
                events.push(Event::LeaseDeleted(lease.id));
                Ok((levels, events))
            })
        })
        .await?;

        info!(lease_id = %id, restored = levels.len(), "lease deleted");
        self.event_sender.send_all(events).await;
        Ok(levels)
    }

    /// Months of the contract so far that have no meter reading
    pub async fn missing_readings(&self, id: Uuid, today: NaiveDate) -> Result<Vec<String>, ServiceError> {
        let lease = self.find(id).await?;
        let recorded: Vec<NaiveDate> = meter_reading::Entity::find()
            .select_only()
            .column(meter_reading::Column::Month)
            .filter(meter_reading::Column::LeaseId.eq(id))
            .into_tuple()
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(missing_months(lease.from_date, lease.to_date, today, &recorded))
    }

    pub(crate) async fn find(&self, id: Uuid) -> Result<lease_contract::Model, ServiceError> {
        lease_contract::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lease contract {} not found", id)))
    }

    async fn require_references(
        &self,
        client_id: Uuid,
        store_id: Uuid,
        machine_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        client::Entity::find_by_id(client_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;
        store::Entity::find_by_id(store_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", store_id)))?;
        machine::Entity::find_by_id(machine_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Machine {} not found", machine_id)))?;
        Ok(())
    }
}
