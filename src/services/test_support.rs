//! Fixtures shared by the service unit tests.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::entities::machine::MachineStatus;
use crate::entities::sale::SaleType;
use crate::entities::call::{CallStatus, WALK_IN};
use crate::entities::store_inquiry::StoreInquiryStatus;
use crate::entities::{
    accessory, call, client, lease_contract, machine, part, sale, store, store_inquiry,
    StockStatus,
};
use crate::events::{Event, EventSender};
use crate::migrator::Migrator;
use crate::services::demand_coordinator::DemandCoordinator;

/// Single-connection in-memory database with the schema applied
pub async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub store: Uuid,
    pub event_sender: EventSender,
    pub coordinator: DemandCoordinator,
    pub events: mpsc::Receiver<Event>,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = Arc::new(memory_db().await);
        let store = seed_store(&db).await;
        let (tx, events) = mpsc::channel(1024);
        let event_sender = EventSender::new(tx);
        let coordinator = DemandCoordinator::new(db.clone(), event_sender.clone());
        Self {
            db,
            store,
            event_sender,
            coordinator,
            events,
        }
    }

    /// Everything published so far
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

pub async fn seed_store(db: &DatabaseConnection) -> Uuid {
    store::ActiveModel {
        store_name: Set(format!("Store {}", Uuid::new_v4())),
        location: Set("Nairobi".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("store")
    .id
}

pub async fn seed_client(db: &DatabaseConnection) -> Uuid {
    client::ActiveModel {
        client_name: Set("Acme Printing".to_string()),
        client_location: Set("Westlands".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("client")
    .id
}

pub async fn seed_part(db: &DatabaseConnection, store_id: Uuid, quantity: i32) -> Uuid {
    part::ActiveModel {
        store_id: Set(store_id),
        part_name: Set("Fuser unit".to_string()),
        part_type: Set("Fuser".to_string()),
        ref_no: Set(format!("P-{}", Uuid::new_v4())),
        unit_value: Set(dec!(25.00)),
        initial_quantity: Set(quantity),
        quantity: Set(quantity),
        status: Set(StockStatus::for_intake(quantity).as_str().to_string()),
        is_transfer: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("part")
    .id
}

pub async fn seed_accessory(db: &DatabaseConnection, store_id: Uuid, quantity: i32) -> Uuid {
    accessory::ActiveModel {
        store_id: Set(store_id),
        acc_name: Set("Paper tray".to_string()),
        acc_type: Set("Tray".to_string()),
        ref_no: Set(format!("A-{}", Uuid::new_v4())),
        unit_value: Set(dec!(40.00)),
        initial_quantity: Set(quantity),
        quantity: Set(quantity),
        status: Set(StockStatus::for_intake(quantity).as_str().to_string()),
        is_transfer: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("accessory")
    .id
}

pub async fn seed_machine(db: &DatabaseConnection, store_id: Uuid, serial_no: &str) -> Uuid {
    machine::ActiveModel {
        store_id: Set(store_id),
        machine_name: Set("Copier 5000".to_string()),
        machine_type: Set("Copier".to_string()),
        serial_no: Set(serial_no.to_string()),
        machine_condition: Set("New".to_string()),
        unit_value: Set(dec!(1500.00)),
        quantity: Set(1),
        status: Set(MachineStatus::Available.as_str().to_string()),
        is_transfer: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("machine")
    .id
}

pub async fn seed_sale(db: &DatabaseConnection) -> Uuid {
    let client_id = seed_client(db).await;
    sale::ActiveModel {
        sale_no: Set(format!("SN-01/26/{}", 10000 + rand::random::<u32>() % 90000)),
        sale_type: Set(SaleType::Internal.as_str().to_string()),
        client_id: Set(Some(client_id)),
        sale_date: Set(Utc::now().date_naive()),
        add_vat: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("sale")
    .id
}

/// Lease over a fresh machine and client, running through 2026
pub async fn seed_lease(db: &DatabaseConnection, store_id: Uuid, active: bool) -> Uuid {
    let client_id = seed_client(db).await;
    let machine_id = seed_machine(db, store_id, &format!("M-{}", Uuid::new_v4())).await;
    lease_contract::ActiveModel {
        lease_no: Set(format!("LN-01/26/{}", 10000 + rand::random::<u32>() % 90000)),
        client_id: Set(client_id),
        item_id: Set(machine_id),
        store_id: Set(store_id),
        from_date: Set(NaiveDate::from_ymd_opt(2026, 1, 1).expect("date")),
        to_date: Set(NaiveDate::from_ymd_opt(2026, 12, 31).expect("date")),
        add_vat: Set(false),
        add_myq: Set(false),
        billed_myq: Set(false),
        is_active: Set(active),
        contract_type: Set("Lease".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("lease")
    .id
}

pub async fn seed_walk_in_call(db: &DatabaseConnection) -> Uuid {
    call::ActiveModel {
        ticket_no: Set(format!("TN-01/26/{}", 10000 + rand::random::<u32>() % 90000)),
        contract_type: Set(WALK_IN.to_string()),
        client_name: Set(Some("Front desk".to_string())),
        client_location: Set(Some("CBD".to_string())),
        walk_in_machine_name: Set(Some("Copier".to_string())),
        walk_in_serial_no: Set(Some("WI-1".to_string())),
        reported_by: Set("Reception".to_string()),
        reported_date: Set(Utc::now().date_naive()),
        fault_reported: Set("Paper jam".to_string()),
        status: Set(CallStatus::Open.as_str().to_string()),
        technician_manager_approval: Set(false),
        client_verification: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("call")
    .id
}

/// Walk-in call raised against a registered customer machine
pub async fn seed_call_on_client_machine(db: &DatabaseConnection, client_machine_id: Uuid) -> Uuid {
    let id = seed_walk_in_call(db).await;
    call::ActiveModel {
        id: Set(id),
        client_machine_id: Set(Some(client_machine_id)),
        ..Default::default()
    }
    .update(db)
    .await
    .expect("call on client machine")
    .id
}

/// Requisition for `quantity` of `part_id` raised under `call_id`
pub async fn seed_store_inquiry(
    db: &DatabaseConnection,
    call_id: Uuid,
    part_id: Uuid,
    quantity: i32,
    status: StoreInquiryStatus,
) -> Uuid {
    store_inquiry::ActiveModel {
        service_call_id: Set(call_id),
        part_name: Set("Fuser unit".to_string()),
        part_id: Set(Some(part_id)),
        quantity: Set(quantity),
        requested_by: Set(Uuid::new_v4()),
        add_vat: Set(false),
        is_issued: Set(false),
        status: Set(status.as_str().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("store inquiry")
    .id
}

pub async fn part_quantity(db: &DatabaseConnection, part_id: Uuid) -> i32 {
    part::Entity::find_by_id(part_id)
        .one(db)
        .await
        .expect("query")
        .expect("part exists")
        .quantity
}
