//! HTTP handlers. Each module owns the routes of one area; authorization is
//! decided here with [`require_edit`](crate::auth::require_edit) before any
//! service call that writes.

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    calls::CallService, client_machines::ClientMachineService, deliveries::DeliveryService,
    demand_coordinator::DemandCoordinator, inventory_items::InventoryItemService,
    item_types::ItemTypeService, leases::LeaseService,
    meter_readings::MeterReadingService, sales::SaleService, stock_aggregator::StockAggregator,
    store_inquiries::StoreInquiryService,
};

pub mod calls;
pub mod catalogs;
pub mod common;
pub mod deliveries;
pub mod health;
pub mod inventory;
pub mod leases;
pub mod sales;
pub mod stores;

/// Service container shared by all handlers through `AppState`
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<InventoryItemService>,
    pub client_machines: Arc<ClientMachineService>,
    pub item_types: Arc<ItemTypeService>,
    pub aggregator: Arc<StockAggregator>,
    pub coordinator: Arc<DemandCoordinator>,
    pub sales: Arc<SaleService>,
    pub leases: Arc<LeaseService>,
    pub meter_readings: Arc<MeterReadingService>,
    pub calls: Arc<CallService>,
    pub store_inquiries: Arc<StoreInquiryService>,
    pub deliveries: Arc<DeliveryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, numbering_attempts: u32) -> Self {
        Self {
            inventory: Arc::new(InventoryItemService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            client_machines: Arc::new(ClientMachineService::new(db_pool.clone())),
            item_types: Arc::new(ItemTypeService::new(db_pool.clone())),
            aggregator: Arc::new(StockAggregator::new(db_pool.clone())),
            coordinator: Arc::new(DemandCoordinator::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            sales: Arc::new(SaleService::new(
                db_pool.clone(),
                event_sender.clone(),
                numbering_attempts,
            )),
            leases: Arc::new(LeaseService::new(
                db_pool.clone(),
                event_sender.clone(),
                numbering_attempts,
            )),
            meter_readings: Arc::new(MeterReadingService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            calls: Arc::new(CallService::new(
                db_pool.clone(),
                event_sender.clone(),
                numbering_attempts,
            )),
            store_inquiries: Arc::new(StoreInquiryService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            deliveries: Arc::new(DeliveryService::new(
                db_pool,
                event_sender,
                numbering_attempts,
            )),
        }
    }
}
