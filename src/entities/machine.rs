use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Machines move as whole units, so their lifecycle is status only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MachineStatus {
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "Reserved")]
    Reserved,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Maintenance")]
    Maintenance,
    #[serde(rename = "Leased")]
    Leased,
    #[serde(rename = "Sold")]
    Sold,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Available => "Available",
            MachineStatus::Reserved => "Reserved",
            MachineStatus::OutOfStock => "Out of Stock",
            MachineStatus::Maintenance => "Maintenance",
            MachineStatus::Leased => "Leased",
            MachineStatus::Sold => "Sold",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(MachineStatus::Available),
            "Reserved" => Some(MachineStatus::Reserved),
            "Out of Stock" => Some(MachineStatus::OutOfStock),
            "Maintenance" => Some(MachineStatus::Maintenance),
            "Leased" => Some(MachineStatus::Leased),
            "Sold" => Some(MachineStatus::Sold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MachineCondition {
    New,
    Used,
    Refurbished,
}

impl MachineCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineCondition::New => "New",
            MachineCondition::Used => "Used",
            MachineCondition::Refurbished => "Refurbished",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "machines")]
#[schema(as = Machine)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub machine_name: String,
    pub machine_type: String,
    #[sea_orm(unique)]
    pub serial_no: String,
    pub machine_condition: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_value: Decimal,
    pub quantity: i32,
    pub status: String,
    pub is_transfer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn machine_status(&self) -> Option<MachineStatus> {
        MachineStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            active_model.created_at = Set(now);
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
