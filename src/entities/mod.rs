//! sea-orm entities for the dealer inventory schema.
//!
//! Enumerated columns are stored as their display labels (`"Out of Stock"`,
//! `"In Transit"`, ...) and converted with `as_str` / `from_str`.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod accessory;
pub mod call;
pub mod call_technician;
pub mod client;
pub mod client_machine;
pub mod delivery;
pub mod item_type;
pub mod lease_acc_inquiry;
pub mod lease_contract;
pub mod lease_part_inquiry;
pub mod machine;
pub mod meter_reading;
pub mod part;
pub mod sale;
pub mod sale_item;
pub mod store;
pub mod store_inquiry;

/// Kind of inventory item a demand record points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ItemKind {
    Machine,
    Part,
    Accessory,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Machine => "Machine",
            ItemKind::Part => "Part",
            ItemKind::Accessory => "Accessory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Machine" => Some(ItemKind::Machine),
            "Part" => Some(ItemKind::Part),
            "Accessory" => Some(ItemKind::Accessory),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed pointer to one inventory row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: Uuid,
}

impl ItemRef {
    pub fn machine(id: Uuid) -> Self {
        Self {
            kind: ItemKind::Machine,
            id,
        }
    }

    pub fn part(id: Uuid) -> Self {
        Self {
            kind: ItemKind::Part,
            id,
        }
    }

    pub fn accessory(id: Uuid) -> Self {
        Self {
            kind: ItemKind::Accessory,
            id,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Which table a demand record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DemandKind {
    SaleItem,
    LeasePartInquiry,
    LeaseAccInquiry,
}

impl fmt::Display for DemandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DemandKind::SaleItem => "sale item",
            DemandKind::LeasePartInquiry => "lease part inquiry",
            DemandKind::LeaseAccInquiry => "lease accessory inquiry",
        })
    }
}

/// Status of a divisible stock line (parts and accessories)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum StockStatus {
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "Reserved")]
    Reserved,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Maintenance")]
    Maintenance,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "Available",
            StockStatus::Reserved => "Reserved",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::Maintenance => "Maintenance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(StockStatus::Available),
            "Reserved" => Some(StockStatus::Reserved),
            "Out of Stock" => Some(StockStatus::OutOfStock),
            "Maintenance" => Some(StockStatus::Maintenance),
            _ => None,
        }
    }

    /// Status a freshly received line starts in
    pub fn for_intake(quantity: i32) -> Self {
        if quantity > 0 {
            StockStatus::Available
        } else {
            StockStatus::OutOfStock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_status_labels_round_trip() {
        for status in [
            StockStatus::Available,
            StockStatus::Reserved,
            StockStatus::OutOfStock,
            StockStatus::Maintenance,
        ] {
            assert_eq!(StockStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(StockStatus::OutOfStock.as_str(), "Out of Stock");
    }

    #[test]
    fn intake_status_depends_on_quantity() {
        assert_eq!(StockStatus::for_intake(3), StockStatus::Available);
        assert_eq!(StockStatus::for_intake(0), StockStatus::OutOfStock);
    }

    #[test]
    fn item_kind_parses_sale_type_labels() {
        assert_eq!(ItemKind::from_str("Part"), Some(ItemKind::Part));
        assert_eq!(ItemKind::from_str("part"), None);
    }
}
