use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SaleType {
    /// Sale to a registered client
    Internal,
    /// Counter sale; the client may be created on the fly
    Local,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Internal => "Internal",
            SaleType::Local => "Local",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Internal" => Some(SaleType::Internal),
            "Local" => Some(SaleType::Local),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "sales")]
#[schema(as = Sale)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sale_no: String,
    pub sale_type: String,
    pub client_id: Option<Uuid>,
    pub local_client_name: Option<String>,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
    pub add_vat: bool,
    pub store_inquiry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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
        belongs_to = "super::store_inquiry::Entity",
        from = "Column::StoreInquiryId",
        to = "super::store_inquiry::Column::Id"
    )]
    StoreInquiry,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::store_inquiry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreInquiry.def()
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
