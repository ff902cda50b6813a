// Stock write path
pub mod demand_coordinator;
pub mod stock_aggregator;
pub mod stock_ledger;

// Items, stores and clients
pub mod client_machines;
pub mod inventory_items;
pub mod item_types;

// Workflow shells
pub mod calls;
pub mod deliveries;
pub mod document_numbers;
pub mod leases;
pub mod meter_readings;
pub mod sales;
pub mod store_inquiries;

#[cfg(test)]
pub(crate) mod test_support;
