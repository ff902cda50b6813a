use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "lease_acc_inquiries")]
#[schema(as = LeaseAccInquiry)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lease_id: Uuid,
    pub accessory_id: Uuid,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub vat: Decimal,
    pub date: NaiveDate,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lease_contract::Entity",
        from = "Column::LeaseId",
        to = "super::lease_contract::Column::Id"
    )]
    LeaseContract,
    #[sea_orm(
        belongs_to = "super::accessory::Entity",
        from = "Column::AccessoryId",
        to = "super::accessory::Column::Id"
    )]
    Accessory,
}

impl Related<super::lease_contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeaseContract.def()
    }
}

impl Related<super::accessory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accessory.def()
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
