use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum StoreInquiryStatus {
    Pending,
    Issued,
    Rejected,
}

impl StoreInquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreInquiryStatus::Pending => "Pending",
            StoreInquiryStatus::Issued => "Issued",
            StoreInquiryStatus::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(StoreInquiryStatus::Pending),
            "Issued" => Some(StoreInquiryStatus::Issued),
            "Rejected" => Some(StoreInquiryStatus::Rejected),
            _ => None,
        }
    }
}

/// Parts requisition raised against a service call.
///
/// The stock it consumes is committed by the lease part inquiries created
/// under it, never by the requisition row itself.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "store_inquiries")]
#[schema(as = StoreInquiry)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub service_call_id: Uuid,
    pub part_name: String,
    pub part_id: Option<Uuid>,
    pub quantity: i32,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub unit_price: Option<Decimal>,
    pub add_vat: bool,
    pub is_issued: bool,
    pub issued_by: Option<Uuid>,
    pub status: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::call::Entity",
        from = "Column::ServiceCallId",
        to = "super::call::Column::Id"
    )]
    Call,
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::Id"
    )]
    Part,
}

impl Related<super::call::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Call.def()
    }
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
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
            if let ActiveValue::NotSet = active_model.requested_at {
                active_model.requested_at = Set(now);
            }
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
