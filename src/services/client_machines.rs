//! Customer-owned machines brought in for service.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::inventory_items::{delete_error, duplicate, referenced_by};
use crate::entities::{call, client_machine};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClientMachineRequest {
    #[validate(length(min = 1, max = 255))]
    pub client_name: String,
    #[validate(length(min = 1, max = 255))]
    pub client_location: String,
    #[validate(length(min = 1, max = 255))]
    pub machine_name: String,
    #[validate(length(min = 1, max = 120))]
    pub machine_brand: String,
    #[validate(length(min = 1, max = 120))]
    pub serial_no: String,
    #[validate(length(min = 1, max = 120))]
    pub machine_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClientMachineRequest {
    #[validate(length(min = 1, max = 255))]
    pub client_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub client_location: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub machine_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub machine_brand: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub serial_no: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub machine_type: Option<String>,
    pub description: Option<String>,
}

/// Narrows the list to one customer site
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientMachineFilter {
    pub client_name: Option<String>,
    pub client_location: Option<String>,
}

#[derive(Clone)]
pub struct ClientMachineService {
    db: Arc<DatabaseConnection>,
}

impl ClientMachineService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, req), fields(serial_no = %req.serial_no))]
    pub async fn create(
        &self,
        req: CreateClientMachineRequest,
    ) -> Result<client_machine::Model, ServiceError> {
        req.validate()?;
        let model = client_machine::ActiveModel {
            client_name: Set(req.client_name),
            client_location: Set(req.client_location),
            machine_name: Set(req.machine_name),
            machine_brand: Set(req.machine_brand),
            serial_no: Set(req.serial_no.clone()),
            machine_type: Set(req.machine_type),
            description: Set(req.description),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(duplicate("Client machine with serial_no", &req.serial_no))?;
        info!(client_machine_id = %model.id, "client machine registered");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<client_machine::Model, ServiceError> {
        client_machine::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Client machine {} not found", id)))
    }

    pub async fn list(
        &self,
        filter: ClientMachineFilter,
    ) -> Result<Vec<client_machine::Model>, ServiceError> {
        let mut query = client_machine::Entity::find();
        if let Some(name) = filter.client_name {
            query = query.filter(client_machine::Column::ClientName.eq(name));
        }
        if let Some(location) = filter.client_location {
            query = query.filter(client_machine::Column::ClientLocation.eq(location));
        }
        query
            .order_by_asc(client_machine::Column::ClientName)
            .order_by_asc(client_machine::Column::SerialNo)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateClientMachineRequest,
    ) -> Result<client_machine::Model, ServiceError> {
        req.validate()?;
        let existing = self.get(id).await?;
        let on_duplicate = duplicate(
            "Client machine with serial_no",
            req.serial_no.as_deref().unwrap_or(""),
        );

        let mut active: client_machine::ActiveModel = existing.into();
        if let Some(v) = req.client_name {
            active.client_name = Set(v);
        }
        if let Some(v) = req.client_location {
            active.client_location = Set(v);
        }
        if let Some(v) = req.machine_name {
            active.machine_name = Set(v);
        }
        if let Some(v) = req.machine_brand {
            active.machine_brand = Set(v);
        }
        if let Some(v) = req.serial_no {
            active.serial_no = Set(v);
        }
        if let Some(v) = req.machine_type {
            active.machine_type = Set(v);
        }
        if let Some(v) = req.description {
            active.description = Set(Some(v));
        }
        active.update(&*self.db).await.map_err(on_duplicate)
    }

    /// Refused while a call still points at the machine.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let db = &*self.db;
        let calls = call::Entity::find()
            .filter(call::Column::ClientMachineId.eq(id))
            .count(db)
            .await?;
        let what = format!("client machine {}", existing.serial_no);
        referenced_by(what.clone(), &[(calls, "call(s)")])?;

        client_machine::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(delete_error(what))?;
        info!(client_machine_id = %id, "client machine deleted");
        Ok(())
    }
}
