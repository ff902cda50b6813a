use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Contract type that marks a call from a customer with no contract on file
pub const WALK_IN: &str = "WalkIn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CallStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Complete")]
    Complete,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Open => "Open",
            CallStatus::Pending => "Pending",
            CallStatus::InProgress => "In Progress",
            CallStatus::Complete => "Complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Open" => Some(CallStatus::Open),
            "Pending" => Some(CallStatus::Pending),
            "In Progress" => Some(CallStatus::InProgress),
            "Complete" => Some(CallStatus::Complete),
            _ => None,
        }
    }

    /// Accepts the labels and their snake-case query forms (`in_progress`).
    pub fn from_filter(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(' ', "_").as_str() {
            "open" => Some(CallStatus::Open),
            "pending" => Some(CallStatus::Pending),
            "in_progress" => Some(CallStatus::InProgress),
            "complete" => Some(CallStatus::Complete),
            _ => None,
        }
    }
}

/// A service ticket raised by or for a client
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "calls")]
#[schema(as = Call)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub ticket_no: String,
    pub contract_type: String,
    pub client_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub client_location: Option<String>,
    pub client_machine_id: Option<Uuid>,
    pub walk_in_machine_name: Option<String>,
    pub walk_in_machine_type: Option<String>,
    pub walk_in_serial_no: Option<String>,
    pub reported_by: String,
    pub reported_date: NaiveDate,
    pub fault_reported: String,
    /// Steps taken on site, in order
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Vec<String>)]
    pub action_taken: Json,
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Vec<String>)]
    pub parts_required: Json,
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Vec<String>)]
    pub parts_used: Json,
    pub meter_reading: i64,
    pub spare_description: Option<String>,
    pub comments: Option<String>,
    pub department: Option<String>,
    pub status: String,
    pub is_checked: bool,
    pub director_comment: Option<String>,
    pub technician_manager_approval: bool,
    pub client_verification: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_walk_in(&self) -> bool {
        self.contract_type == WALK_IN
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::ItemId",
        to = "super::machine::Column::Id"
    )]
    Machine,
    #[sea_orm(
        belongs_to = "super::client_machine::Entity",
        from = "Column::ClientMachineId",
        to = "super::client_machine::Column::Id"
    )]
    ClientMachine,
    #[sea_orm(has_many = "super::call_technician::Entity")]
    Technicians,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl Related<super::client_machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientMachine.def()
    }
}

impl Related<super::call_technician::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Technicians.def()
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
            for list in [
                &mut active_model.action_taken,
                &mut active_model.parts_required,
                &mut active_model.parts_used,
            ] {
                if let ActiveValue::NotSet = list {
                    *list = Set(Json::Array(Vec::new()));
                }
            }
            if let ActiveValue::NotSet = active_model.meter_reading {
                active_model.meter_reading = Set(0);
            }
            if let ActiveValue::NotSet = active_model.is_checked {
                active_model.is_checked = Set(false);
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
