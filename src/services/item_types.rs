//! Machine, part and accessory type catalogs.
//!
//! Entries are reference data offered when items are recorded; the item rows
//! keep their type as text, so catalog edits never rewrite stock.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::inventory_items::duplicate;
use crate::entities::{item_type, ItemKind};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItemTypeRequest {
    pub category: ItemKind,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub type_name: String,
    #[validate(length(min = 1, max = 120))]
    pub brand: String,
    #[validate(length(min = 1, max = 60))]
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemTypeRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub type_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemTypeFilter {
    /// `Machine`, `Part` or `Accessory`
    pub category: Option<ItemKind>,
}

#[derive(Clone)]
pub struct ItemTypeService {
    db: Arc<DatabaseConnection>,
}

impl ItemTypeService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, req), fields(category = %req.category))]
    pub async fn create(&self, req: CreateItemTypeRequest) -> Result<item_type::Model, ServiceError> {
        req.validate()?;
        let label = format!("{} type", req.category);
        let model = item_type::ActiveModel {
            category: Set(req.category.as_str().to_string()),
            name: Set(req.name.clone()),
            type_name: Set(req.type_name),
            brand: Set(req.brand),
            color: Set(req.color),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(duplicate(&label, &req.name))?;
        info!(item_type_id = %model.id, "item type added");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<item_type::Model, ServiceError> {
        item_type::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item type {} not found", id)))
    }

    pub async fn list(&self, category: Option<ItemKind>) -> Result<Vec<item_type::Model>, ServiceError> {
        let mut query = item_type::Entity::find();
        if let Some(kind) = category {
            query = query.filter(item_type::Column::Category.eq(kind.as_str()));
        }
        query
            .order_by_asc(item_type::Column::Category)
            .order_by_asc(item_type::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateItemTypeRequest,
    ) -> Result<item_type::Model, ServiceError> {
        req.validate()?;
        let existing = self.get(id).await?;
        let on_duplicate = duplicate(
            &format!("{} type", existing.category),
            req.name.as_deref().unwrap_or(""),
        );

        let mut active: item_type::ActiveModel = existing.into();
        if let Some(v) = req.name {
            active.name = Set(v);
        }
        if let Some(v) = req.type_name {
            active.type_name = Set(v);
        }
        if let Some(v) = req.brand {
            active.brand = Set(v);
        }
        if let Some(v) = req.color {
            active.color = Set(v);
        }
        active.update(&*self.db).await.map_err(on_duplicate)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        item_type::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(item_type_id = %id, "item type removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;
    use assert_matches::assert_matches;

    fn entry(category: ItemKind, name: &str) -> CreateItemTypeRequest {
        CreateItemTypeRequest {
            category,
            name: name.into(),
            type_name: "Mono".into(),
            brand: "Kyocera".into(),
            color: "Black".into(),
        }
    }

    #[tokio::test]
    async fn names_are_unique_within_a_category() {
        let ctx = TestContext::new().await;
        let svc = ItemTypeService::new(ctx.db.clone());
        svc.create(entry(ItemKind::Part, "Toner")).await.unwrap();
        svc.create(entry(ItemKind::Accessory, "Toner")).await.unwrap();

        let err = svc.create(entry(ItemKind::Part, "Toner")).await.unwrap_err();
        assert_matches!(err, ServiceError::Conflict(msg) if msg == "Part type Toner already exists");
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let ctx = TestContext::new().await;
        let svc = ItemTypeService::new(ctx.db.clone());
        svc.create(entry(ItemKind::Machine, "Copier")).await.unwrap();
        svc.create(entry(ItemKind::Part, "Fuser")).await.unwrap();
        svc.create(entry(ItemKind::Part, "Drum")).await.unwrap();

        let parts = svc.list(Some(ItemKind::Part)).await.unwrap();
        let names: Vec<_> = parts.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Drum", "Fuser"]);
        assert_eq!(svc.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rename_and_remove() {
        let ctx = TestContext::new().await;
        let svc = ItemTypeService::new(ctx.db.clone());
        let drum = svc.create(entry(ItemKind::Part, "Drum")).await.unwrap();
        svc.create(entry(ItemKind::Part, "Fuser")).await.unwrap();

        let err = svc
            .update(
                drum.id,
                UpdateItemTypeRequest {
                    name: Some("Fuser".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));

        let renamed = svc
            .update(
                drum.id,
                UpdateItemTypeRequest {
                    name: Some("Drum unit".into()),
                    color: Some("Grey".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Drum unit");
        assert_eq!(renamed.color, "Grey");

        svc.delete(drum.id).await.unwrap();
        assert_matches!(svc.get(drum.id).await, Err(ServiceError::NotFound(_)));
    }
}
