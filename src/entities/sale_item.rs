use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ItemKind, ItemRef};

/// One line of a sale. Exactly one of the three item columns is set, the
/// one named by `sale_type`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "sale_items")]
#[schema(as = SaleItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sale_id: Uuid,
    pub sale_type: String,
    pub machine_id: Option<Uuid>,
    pub part_id: Option<Uuid>,
    pub accessory_id: Option<Uuid>,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// The inventory row this line draws from, if the columns are consistent
    pub fn item_ref(&self) -> Option<ItemRef> {
        match ItemKind::from_str(&self.sale_type)? {
            ItemKind::Machine => self.machine_id.map(ItemRef::machine),
            ItemKind::Part => self.part_id.map(ItemRef::part),
            ItemKind::Accessory => self.accessory_id.map(ItemRef::accessory),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::MachineId",
        to = "super::machine::Column::Id"
    )]
    Machine,
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::Id"
    )]
    Part,
    #[sea_orm(
        belongs_to = "super::accessory::Entity",
        from = "Column::AccessoryId",
        to = "super::accessory::Column::Id"
    )]
    Accessory,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(sale_type: &str) -> Model {
        Model {
            id: Uuid::new_v4(),
            sale_id: Uuid::new_v4(),
            sale_type: sale_type.to_string(),
            machine_id: None,
            part_id: Some(Uuid::nil()),
            accessory_id: None,
            quantity: 2,
            unit_price: dec!(10.00),
            total_price: dec!(20.00),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn item_ref_follows_sale_type() {
        assert_eq!(line("Part").item_ref(), Some(ItemRef::part(Uuid::nil())));
        assert_eq!(line("Accessory").item_ref(), None);
        assert_eq!(line("Gadget").item_ref(), None);
    }
}
