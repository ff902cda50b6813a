//! Service calls (tickets).
//!
//! A call either belongs to a client and one of their machines, or is a
//! walk-in described by free-text fields, optionally filled in from a
//! registered client machine. Technicians are assigned as a set and replaced
//! whole. Store inquiries hang off calls, so deleting a call cascades through
//! them and their lease part inquiries.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::demand_coordinator::parent_delete_error;
use super::document_numbers::{insert_numbered, DocumentPrefix};
use super::stock_ledger::StockLevel;
use super::store_inquiries::{children_of, delete_store_inquiry_in};
use crate::db::in_transaction;
use crate::entities::call::{CallStatus, WALK_IN};
use crate::entities::{call, call_technician, client, client_machine, machine, store_inquiry};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCallRequest {
    /// Preset ticket number; generated when absent
    pub ticket_no: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub contract_type: String,
    pub client_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub client_location: Option<String>,
    /// Walk-in only: registered machine whose details fill the blanks
    pub client_machine_id: Option<Uuid>,
    pub walk_in_machine_name: Option<String>,
    pub walk_in_machine_type: Option<String>,
    pub walk_in_serial_no: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub reported_by: String,
    pub reported_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub fault_reported: String,
    #[serde(default)]
    pub action_taken: Vec<String>,
    #[serde(default)]
    pub parts_required: Vec<String>,
    #[serde(default)]
    pub parts_used: Vec<String>,
    #[validate(range(min = 0))]
    pub meter_reading: Option<i64>,
    pub spare_description: Option<String>,
    pub comments: Option<String>,
    pub department: Option<String>,
    /// User ids of the assigned technicians
    #[serde(default)]
    pub technicians: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCallRequest {
    #[validate(length(min = 1, max = 255))]
    pub reported_by: Option<String>,
    pub reported_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub fault_reported: Option<String>,
    pub walk_in_machine_type: Option<String>,
    pub action_taken: Option<Vec<String>>,
    pub parts_required: Option<Vec<String>>,
    pub parts_used: Option<Vec<String>>,
    #[validate(range(min = 0))]
    pub meter_reading: Option<i64>,
    pub spare_description: Option<String>,
    pub comments: Option<String>,
    pub department: Option<String>,
    pub status: Option<CallStatus>,
    pub is_checked: Option<bool>,
    pub director_comment: Option<String>,
    /// Replaces the whole assignment when present
    pub technicians: Option<Vec<Uuid>>,
}

/// Call with the technicians assigned to it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CallDetail {
    #[serde(flatten)]
    pub call: call::Model,
    pub technicians: Vec<Uuid>,
}

/// List narrowing; every field is optional
#[derive(Debug, Clone, Default)]
pub struct CallFilter {
    pub status: Option<CallStatus>,
    pub technician: Option<Uuid>,
    /// Inclusive bounds on `reported_date`
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalField {
    TechnicianManagerApproval,
    ClientVerification,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    pub field: ApprovalField,
    pub value: bool,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

/// Fills walk-in blanks from a registered machine; given values win.
fn fill_from_client_machine(req: &mut CreateCallRequest, known: client_machine::Model) {
    let pairs = [
        (&mut req.client_name, known.client_name),
        (&mut req.client_location, known.client_location),
        (&mut req.walk_in_machine_name, known.machine_name),
        (&mut req.walk_in_machine_type, known.machine_type),
        (&mut req.walk_in_serial_no, known.serial_no),
    ];
    for (slot, value) in pairs {
        if !present(slot) {
            *slot = Some(value);
        }
    }
}

fn check_walk_in(req: &CreateCallRequest) -> Result<(), ServiceError> {
    let missing: Vec<&str> = [
        ("client_name", &req.client_name),
        ("client_location", &req.client_location),
        ("walk_in_machine_name", &req.walk_in_machine_name),
        ("walk_in_serial_no", &req.walk_in_serial_no),
    ]
    .into_iter()
    .filter(|(_, value)| !present(value))
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Walk-in calls require {}",
            missing.join(", ")
        )))
    }
}

fn check_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ServiceError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ServiceError::ValidationError(
            "End date must be after start date".to_string(),
        )),
        _ => Ok(()),
    }
}

fn string_list(values: Vec<String>) -> sea_orm::prelude::Json {
    values.into_iter().map(sea_orm::prelude::Json::String).collect()
}

/// Swaps the technicians of `call_id` for `technicians`, dropping repeats.
pub async fn replace_technicians_in<C>(
    conn: &C,
    call_id: Uuid,
    technicians: &[Uuid],
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    call_technician::Entity::delete_many()
        .filter(call_technician::Column::CallId.eq(call_id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut seen = Vec::with_capacity(technicians.len());
    for technician in technicians {
        if seen.contains(technician) {
            continue;
        }
        seen.push(*technician);
        call_technician::ActiveModel {
            call_id: Set(call_id),
            technician_id: Set(*technician),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
    }
    Ok(())
}

async fn technicians_by_call<C>(
    conn: &C,
    call_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<Uuid>>, ServiceError>
where
    C: ConnectionTrait,
{
    let rows = call_technician::Entity::find()
        .filter(call_technician::Column::CallId.is_in(call_ids))
        .order_by_asc(call_technician::Column::AssignedAt)
        .order_by_asc(call_technician::Column::TechnicianId)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let mut by_call: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        by_call.entry(row.call_id).or_default().push(row.technician_id);
    }
    Ok(by_call)
}

#[derive(Clone)]
pub struct CallService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    numbering_attempts: u32,
}

impl CallService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, numbering_attempts: u32) -> Self {
        Self {
            db,
            event_sender,
            numbering_attempts,
        }
    }

    #[instrument(skip(self, req), fields(contract_type = %req.contract_type))]
    pub async fn create(&self, mut req: CreateCallRequest) -> Result<CallDetail, ServiceError> {
        req.validate()?;
        let walk_in = req.contract_type == WALK_IN;

        let template = if walk_in {
            if let Some(id) = req.client_machine_id {
                let known = self.get_client_machine(id).await?;
                fill_from_client_machine(&mut req, known);
            }
            check_walk_in(&req)?;
            call::ActiveModel {
                contract_type: Set(req.contract_type),
                client_id: Set(None),
                item_id: Set(None),
                client_name: Set(req.client_name),
                client_location: Set(req.client_location),
                client_machine_id: Set(req.client_machine_id),
                walk_in_machine_name: Set(req.walk_in_machine_name),
                walk_in_machine_type: Set(req.walk_in_machine_type),
                walk_in_serial_no: Set(req.walk_in_serial_no),
                ..Default::default()
            }
        } else {
            if req.client_machine_id.is_some() {
                return Err(ServiceError::ValidationError(
                    "client_machine_id applies to walk-in calls only".to_string(),
                ));
            }
            let (client_id, item_id) = match (req.client_id, req.item_id) {
                (Some(c), Some(i)) => (c, i),
                _ => {
                    return Err(ServiceError::ValidationError(
                        "Contract calls require client_id and item_id".to_string(),
                    ))
                }
            };
            self.require_client_and_machine(client_id, item_id).await?;
            call::ActiveModel {
                contract_type: Set(req.contract_type),
                client_id: Set(Some(client_id)),
                item_id: Set(Some(item_id)),
                client_name: Set(None),
                client_location: Set(None),
                client_machine_id: Set(None),
                walk_in_machine_name: Set(None),
                walk_in_machine_type: Set(None),
                walk_in_serial_no: Set(None),
                ..Default::default()
            }
        };
        let template = call::ActiveModel {
            reported_by: Set(req.reported_by),
            reported_date: Set(req.reported_date.unwrap_or_else(|| Utc::now().date_naive())),
            fault_reported: Set(req.fault_reported),
            action_taken: Set(string_list(req.action_taken)),
            parts_required: Set(string_list(req.parts_required)),
            parts_used: Set(string_list(req.parts_used)),
            meter_reading: Set(req.meter_reading.unwrap_or(0)),
            spare_description: Set(req.spare_description),
            comments: Set(req.comments),
            department: Set(req.department),
            status: Set(CallStatus::Open.as_str().to_string()),
            is_checked: Set(false),
            director_comment: Set(None),
            technician_manager_approval: Set(false),
            client_verification: Set(false),
            ..template
        };
        let technicians = Arc::new(req.technicians);

        let call = insert_numbered(
            DocumentPrefix::Ticket,
            req.ticket_no,
            self.numbering_attempts,
            |number| {
                let mut model = template.clone();
                model.ticket_no = Set(number);
                let db = self.db.clone();
                let technicians = technicians.clone();
                async move {
                    in_transaction(&db, move |txn| {
                        Box::pin(async move {
                            let call = model.insert(txn).await.map_err(ServiceError::db_error)?;
                            replace_technicians_in(txn, call.id, &technicians).await?;
                            Ok(call)
                        })
                    })
                    .await
                }
            },
        )
        .await?;

        info!(
            call_id = %call.id,
            ticket_no = %call.ticket_no,
            technicians = technicians.len(),
            "call opened"
        );
        self.detail(call).await
    }

    pub async fn get(&self, id: Uuid) -> Result<CallDetail, ServiceError> {
        let call = self.find(id).await?;
        self.detail(call).await
    }

    pub async fn list(
        &self,
        filter: CallFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<CallDetail>, ServiceError> {
        check_period(filter.start_date, filter.end_date)?;

        let mut query = call::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(call::Column::Status.eq(status.as_str()));
        }
        if let Some(technician) = filter.technician {
            query = query.filter(
                call::Column::Id.in_subquery(
                    Query::select()
                        .column(call_technician::Column::CallId)
                        .from(call_technician::Entity)
                        .and_where(call_technician::Column::TechnicianId.eq(technician))
                        .to_owned(),
                ),
            );
        }
        if let Some(start) = filter.start_date {
            query = query.filter(call::Column::ReportedDate.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(call::Column::ReportedDate.lte(end));
        }

        let calls = query
            .order_by_desc(call::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut assigned =
            technicians_by_call(&*self.db, calls.iter().map(|c| c.id).collect()).await?;
        Ok(calls
            .into_iter()
            .map(|call| CallDetail {
                technicians: assigned.remove(&call.id).unwrap_or_default(),
                call,
            })
            .collect())
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, id: Uuid, req: UpdateCallRequest) -> Result<CallDetail, ServiceError> {
        req.validate()?;
        let existing = self.find(id).await?;
        let was_complete = existing.status == CallStatus::Complete.as_str();

        let mut active: call::ActiveModel = existing.into();
        if let Some(reported_by) = req.reported_by {
            active.reported_by = Set(reported_by);
        }
        if let Some(reported_date) = req.reported_date {
            active.reported_date = Set(reported_date);
        }
        if let Some(fault) = req.fault_reported {
            active.fault_reported = Set(fault);
        }
        if let Some(machine_type) = req.walk_in_machine_type {
            active.walk_in_machine_type = Set(Some(machine_type));
        }
        if let Some(actions) = req.action_taken {
            active.action_taken = Set(string_list(actions));
        }
        if let Some(parts) = req.parts_required {
            active.parts_required = Set(string_list(parts));
        }
        if let Some(parts) = req.parts_used {
            active.parts_used = Set(string_list(parts));
        }
        if let Some(reading) = req.meter_reading {
            active.meter_reading = Set(reading);
        }
        if let Some(spare) = req.spare_description {
            active.spare_description = Set(Some(spare));
        }
        if let Some(comments) = req.comments {
            active.comments = Set(Some(comments));
        }
        if let Some(department) = req.department {
            active.department = Set(Some(department));
        }
        if let Some(status) = req.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(checked) = req.is_checked {
            active.is_checked = Set(checked);
        }
        if let Some(comment) = req.director_comment {
            active.director_comment = Set(Some(comment));
        }

        let technicians = req.technicians;
        let call = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let call = active.update(txn).await.map_err(ServiceError::db_error)?;
                if let Some(technicians) = technicians {
                    replace_technicians_in(txn, call.id, &technicians).await?;
                }
                Ok(call)
            })
        })
        .await?;

        if !was_complete && call.status == CallStatus::Complete.as_str() {
            self.event_sender.send_or_log(Event::CallCompleted(call.id)).await;
        }
        self.detail(call).await
    }

    /// Records one of the two sign-offs. Once both are given the call is
    /// complete.
    #[instrument(skip(self))]
    pub async fn set_approval(
        &self,
        id: Uuid,
        field: ApprovalField,
        value: bool,
    ) -> Result<call::Model, ServiceError> {
        let existing = self.find(id).await?;
        let was_complete = existing.status == CallStatus::Complete.as_str();

        let (manager, client) = match field {
            ApprovalField::TechnicianManagerApproval => (value, existing.client_verification),
            ApprovalField::ClientVerification => (existing.technician_manager_approval, value),
        };

        let mut active: call::ActiveModel = existing.into();
        active.technician_manager_approval = Set(manager);
        active.client_verification = Set(client);
        if manager && client {
            active.status = Set(CallStatus::Complete.as_str().to_string());
        }

        let call = active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        if !was_complete && call.status == CallStatus::Complete.as_str() {
            info!(call_id = %id, "call completed");
            self.event_sender.send_or_log(Event::CallCompleted(id)).await;
        }
        Ok(call)
    }

    /// Deletes the call with its store inquiries and technician assignments,
    /// restoring any stock held by lease part inquiries raised under them.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<Vec<StockLevel>, ServiceError> {
        let existing = self.find(id).await?;
        let inquiries = store_inquiry::Entity::find()
            .filter(store_inquiry::Column::ServiceCallId.eq(id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        let tree = children_of(&*self.db, &inquiries).await?;

        let (levels, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let mut levels = Vec::new();
                for (inquiry, children) in &tree {
                    levels.extend(delete_store_inquiry_in(txn, inquiry, children, &mut events).await?);
                }
                replace_technicians_in(txn, existing.id, &[]).await?;
                call::Entity::delete_by_id(existing.id)
                    .exec(txn)
                    .await
                    .map_err(parent_delete_error(format!("Call {}", existing.ticket_no)))?;
                Ok((levels, events))
            })
        })
        .await?;

        info!(call_id = %id, restored = levels.len(), "call deleted");
        self.event_sender.send_all(events).await;
        Ok(levels)
    }

    async fn find(&self, id: Uuid) -> Result<call::Model, ServiceError> {
        call::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Call {} not found", id)))
    }

    async fn detail(&self, call: call::Model) -> Result<CallDetail, ServiceError> {
        let technicians = technicians_by_call(&*self.db, vec![call.id])
            .await?
            .remove(&call.id)
            .unwrap_or_default();
        Ok(CallDetail { call, technicians })
    }

    async fn get_client_machine(&self, id: Uuid) -> Result<client_machine::Model, ServiceError> {
        client_machine::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client machine {} not found", id)))
    }

    async fn require_client_and_machine(&self, client_id: Uuid, machine_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        client::Entity::find_by_id(client_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;
        machine::Entity::find_by_id(machine_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Machine {} not found", machine_id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::document_numbers::is_well_formed;
    use crate::services::test_support::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn walk_in() -> CreateCallRequest {
        CreateCallRequest {
            ticket_no: None,
            contract_type: WALK_IN.into(),
            client_id: None,
            item_id: None,
            client_name: Some("Jane".into()),
            client_location: Some("Kilimani".into()),
            client_machine_id: None,
            walk_in_machine_name: Some("Printer".into()),
            walk_in_machine_type: None,
            walk_in_serial_no: Some("SN-X".into()),
            reported_by: "Reception".into(),
            reported_date: None,
            fault_reported: "Streaks on output".into(),
            action_taken: Vec::new(),
            parts_required: Vec::new(),
            parts_used: Vec::new(),
            meter_reading: None,
            spare_description: None,
            comments: None,
            department: None,
            technicians: Vec::new(),
        }
    }

    fn reported_on(day: u32) -> CreateCallRequest {
        CreateCallRequest {
            reported_date: NaiveDate::from_ymd_opt(2026, 3, day),
            ..walk_in()
        }
    }

    async fn register_machine(db: &DatabaseConnection, serial_no: &str) -> Uuid {
        client_machine::ActiveModel {
            client_name: Set("Riverside Clinic".into()),
            client_location: Set("Parklands".into()),
            machine_name: Set("TASKalfa 3253ci".into()),
            machine_brand: Set("Kyocera".into()),
            serial_no: Set(serial_no.into()),
            machine_type: Set("Colour copier".into()),
            description: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn walk_in_call_needs_its_free_text_fields() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);

        let detail = svc.create(walk_in()).await.unwrap();
        assert!(is_well_formed(&detail.call.ticket_no));
        assert!(detail.call.ticket_no.starts_with("TN-"));
        assert_eq!(detail.call.status, "Open");
        assert_eq!(detail.call.meter_reading, 0);
        assert_eq!(detail.call.action_taken, json!([]));
        assert!(detail.technicians.is_empty());

        let mut req = walk_in();
        req.walk_in_serial_no = None;
        let err = svc.create(req).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("walk_in_serial_no"));
    }

    #[tokio::test]
    async fn walk_in_fills_blanks_from_a_registered_machine() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let known = register_machine(&ctx.db, "KY-77").await;

        let req = CreateCallRequest {
            client_name: None,
            client_location: None,
            walk_in_machine_name: None,
            walk_in_serial_no: None,
            client_machine_id: Some(known),
            department: Some("Radiology".into()),
            ..walk_in()
        };
        let detail = svc.create(req).await.unwrap();
        let call = detail.call;
        assert_eq!(call.client_machine_id, Some(known));
        assert_eq!(call.client_name.as_deref(), Some("Riverside Clinic"));
        assert_eq!(call.walk_in_machine_type.as_deref(), Some("Colour copier"));
        assert_eq!(call.walk_in_serial_no.as_deref(), Some("KY-77"));

        let kept = svc
            .create(CreateCallRequest {
                client_machine_id: Some(known),
                ..walk_in()
            })
            .await
            .unwrap();
        assert_eq!(kept.call.client_name.as_deref(), Some("Jane"));
        assert_eq!(kept.call.walk_in_machine_type.as_deref(), Some("Colour copier"));

        let err = svc
            .create(CreateCallRequest {
                client_machine_id: Some(Uuid::new_v4()),
                ..walk_in()
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn contract_call_needs_client_and_machine() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let mut req = walk_in();
        req.contract_type = "Lease".into();
        let err = svc.create(req.clone()).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));

        req.client_id = Some(seed_client(&ctx.db).await);
        req.item_id = Some(seed_machine(&ctx.db, ctx.store, "CALL-1").await);
        let detail = svc.create(req.clone()).await.unwrap();
        assert!(detail.call.client_name.is_none());
        assert!(!detail.call.is_walk_in());

        req.client_machine_id = Some(register_machine(&ctx.db, "KY-5").await);
        let err = svc.create(req).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("walk-in"));
    }

    #[tokio::test]
    async fn technician_set_is_replaced_whole() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let detail = svc
            .create(CreateCallRequest {
                technicians: vec![alice, bob, alice],
                ..walk_in()
            })
            .await
            .unwrap();
        let mut assigned = detail.technicians.clone();
        assigned.sort();
        let mut expected = vec![alice, bob];
        expected.sort();
        assert_eq!(assigned, expected);

        let updated = svc
            .update(
                detail.call.id,
                UpdateCallRequest {
                    technicians: Some(vec![carol]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.technicians, vec![carol]);

        let untouched = svc
            .update(
                detail.call.id,
                UpdateCallRequest {
                    comments: Some("Awaiting fuser".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(untouched.technicians, vec![carol]);
    }

    #[tokio::test]
    async fn service_record_is_kept_on_the_call() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let detail = svc.create(walk_in()).await.unwrap();

        let updated = svc
            .update(
                detail.call.id,
                UpdateCallRequest {
                    action_taken: Some(vec!["Cleaned rollers".into(), "Replaced drum".into()]),
                    parts_used: Some(vec!["Drum unit".into()]),
                    meter_reading: Some(48_210),
                    spare_description: Some("DK-1150".into()),
                    is_checked: Some(true),
                    director_comment: Some("Bill the client".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let call = updated.call;
        assert_eq!(call.action_taken, json!(["Cleaned rollers", "Replaced drum"]));
        assert_eq!(call.parts_used, json!(["Drum unit"]));
        assert_eq!(call.parts_required, json!([]));
        assert_eq!(call.meter_reading, 48_210);
        assert!(call.is_checked);
        assert_eq!(call.director_comment.as_deref(), Some("Bill the client"));

        let err = svc
            .update(
                call.id,
                UpdateCallRequest {
                    meter_reading: Some(-1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[tokio::test]
    async fn list_filters_by_status_technician_and_period() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let tech = Uuid::new_v4();

        let early = svc.create(reported_on(2)).await.unwrap().call.id;
        let assigned = svc
            .create(CreateCallRequest {
                technicians: vec![tech],
                ..reported_on(10)
            })
            .await
            .unwrap()
            .call
            .id;
        let late = svc.create(reported_on(25)).await.unwrap().call.id;
        svc.update(
            late,
            UpdateCallRequest {
                status: Some(CallStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let ids = |calls: Vec<CallDetail>| {
            let mut ids: Vec<Uuid> = calls.into_iter().map(|c| c.call.id).collect();
            ids.sort();
            ids
        };

        let mine = svc
            .list(
                CallFilter {
                    technician: Some(tech),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].call.id, assigned);
        assert_eq!(mine[0].technicians, vec![tech]);

        let in_progress = svc
            .list(
                CallFilter {
                    status: Some(CallStatus::InProgress),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(ids(in_progress), vec![late]);

        let first_half = svc
            .list(
                CallFilter {
                    start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                    end_date: NaiveDate::from_ymd_opt(2026, 3, 10),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        let mut expected = vec![early, assigned];
        expected.sort();
        assert_eq!(ids(first_half), expected);

        let err = svc
            .list(
                CallFilter {
                    start_date: NaiveDate::from_ymd_opt(2026, 3, 10),
                    end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "End date must be after start date");
    }

    #[tokio::test]
    async fn deleting_a_call_drops_its_assignments() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let detail = svc
            .create(CreateCallRequest {
                technicians: vec![Uuid::new_v4(), Uuid::new_v4()],
                ..walk_in()
            })
            .await
            .unwrap();

        svc.delete(detail.call.id).await.unwrap();
        let left = call_technician::Entity::find()
            .filter(call_technician::Column::CallId.eq(detail.call.id))
            .all(&*ctx.db)
            .await
            .unwrap();
        assert!(left.is_empty());
        assert_matches!(svc.get(detail.call.id).await, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn both_sign_offs_complete_the_call() {
        let mut ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let call = svc.create(walk_in()).await.unwrap().call;

        let half = svc
            .set_approval(call.id, ApprovalField::ClientVerification, true)
            .await
            .unwrap();
        assert_eq!(half.status, "Open");

        let done = svc
            .set_approval(call.id, ApprovalField::TechnicianManagerApproval, true)
            .await
            .unwrap();
        assert_eq!(done.status, "Complete");
        assert!(ctx
            .drain_events()
            .iter()
            .any(|e| matches!(e, Event::CallCompleted(id) if *id == call.id)));
    }

    #[tokio::test]
    async fn preset_ticket_numbers_must_be_unique() {
        let ctx = TestContext::new().await;
        let svc = CallService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let mut req = walk_in();
        req.ticket_no = Some("TN-02/26/55555".into());
        svc.create(req.clone()).await.unwrap();

        let err = svc.create(req).await.unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
    }
}
