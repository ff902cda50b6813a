//! Deliveries of sold or leased goods.
//!
//! A delivery points at exactly one sale or one lease, matching its type.
//! Client and totals are derived from that parent on every read.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::document_numbers::{insert_numbered, DocumentPrefix};
use crate::entities::delivery::{DeliveryStatus, DeliveryType};
use crate::entities::{client, delivery, lease_acc_inquiry, lease_contract, lease_part_inquiry, sale, sale_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryRequest {
    /// Preset delivery number; generated when absent
    pub delivery_no: Option<String>,
    pub delivery_type: DeliveryType,
    pub sale_id: Option<Uuid>,
    pub lease_id: Option<Uuid>,
    pub assigned_to: Uuid,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<DeliveryStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryRequest {
    pub assigned_to: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<DeliveryStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryDetail {
    #[serde(flatten)]
    pub delivery: delivery::Model,
    pub client_name: Option<String>,
    pub client_location: Option<String>,
    /// Sale lines, or part plus accessory inquiries of the lease
    pub total_items: u64,
    /// Sum of line totals, or of inquiry amounts for a lease
    pub total_amount: Decimal,
}

/// Checks the parent reference against the delivery type.
fn parent_of(req: &CreateDeliveryRequest) -> Result<(Option<Uuid>, Option<Uuid>), ServiceError> {
    match req.delivery_type {
        DeliveryType::Sale => {
            let sale_id = req.sale_id.ok_or_else(|| {
                ServiceError::ValidationError("Sale is required for Sale deliveries".to_string())
            })?;
            if req.lease_id.is_some() {
                return Err(ServiceError::ValidationError(
                    "Sale deliveries cannot reference a lease".to_string(),
                ));
            }
            Ok((Some(sale_id), None))
        }
        DeliveryType::Lease => {
            let lease_id = req.lease_id.ok_or_else(|| {
                ServiceError::ValidationError("Lease is required for Lease deliveries".to_string())
            })?;
            if req.sale_id.is_some() {
                return Err(ServiceError::ValidationError(
                    "Lease deliveries cannot reference a sale".to_string(),
                ));
            }
            Ok((None, Some(lease_id)))
        }
    }
}

#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    numbering_attempts: u32,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, numbering_attempts: u32) -> Self {
        Self {
            db,
            event_sender,
            numbering_attempts,
        }
    }

    #[instrument(skip(self, req), fields(delivery_type = ?req.delivery_type))]
    pub async fn create(&self, req: CreateDeliveryRequest) -> Result<DeliveryDetail, ServiceError> {
        req.validate()?;
        let (sale_id, lease_id) = parent_of(&req)?;
        if let Some(id) = sale_id {
            self.find_sale(id).await?;
        }
        if let Some(id) = lease_id {
            self.find_lease(id).await?;
        }

        let template = delivery::ActiveModel {
            delivery_type: Set(req.delivery_type.as_str().to_string()),
            sale_id: Set(sale_id),
            lease_id: Set(lease_id),
            assigned_to: Set(req.assigned_to),
            delivery_date: Set(req.delivery_date.unwrap_or_else(|| Utc::now().date_naive())),
            status: Set(req
                .status
                .unwrap_or(DeliveryStatus::Pending)
                .as_str()
                .to_string()),
            notes: Set(req.notes),
            ..Default::default()
        };

        let delivery = insert_numbered(
            DocumentPrefix::Delivery,
            req.delivery_no,
            self.numbering_attempts,
            |number| {
                let mut model = template.clone();
                model.delivery_no = Set(number);
                let db = self.db.clone();
                async move { model.insert(&*db).await.map_err(ServiceError::db_error) }
            },
        )
        .await?;

        info!(delivery_id = %delivery.id, delivery_no = %delivery.delivery_no, "delivery scheduled");
        self.detail(delivery).await
    }

    pub async fn get(&self, id: Uuid) -> Result<DeliveryDetail, ServiceError> {
        let delivery = self.find(id).await?;
        self.detail(delivery).await
    }

    pub async fn list(&self, limit: u64, offset: u64) -> Result<Vec<DeliveryDetail>, ServiceError> {
        let rows = delivery::Entity::find()
            .order_by_desc(delivery::Column::DeliveryDate)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.detail(row).await?);
        }
        Ok(out)
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, id: Uuid, req: UpdateDeliveryRequest) -> Result<DeliveryDetail, ServiceError> {
        req.validate()?;
        let existing = self.find(id).await?;
        let previous_status = existing.status.clone();

        let mut active: delivery::ActiveModel = existing.into();
        if let Some(assigned_to) = req.assigned_to {
            active.assigned_to = Set(assigned_to);
        }
        if let Some(delivery_date) = req.delivery_date {
            active.delivery_date = Set(delivery_date);
        }
        if let Some(status) = req.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(notes) = req.notes {
            active.notes = Set(Some(notes));
        }

        let delivery = active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        if delivery.status != previous_status {
            info!(delivery_id = %id, from = %previous_status, to = %delivery.status, "delivery status changed");
            self.event_sender
                .send_or_log(Event::DeliveryStatusChanged {
                    delivery_id: id,
                    from: previous_status,
                    to: delivery.status.clone(),
                })
                .await;
        }
        self.detail(delivery).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = delivery::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Delivery {} not found", id)));
        }
        info!(delivery_id = %id, "delivery deleted");
        Ok(())
    }

    async fn detail(&self, delivery: delivery::Model) -> Result<DeliveryDetail, ServiceError> {
        let db = &*self.db;
        let mut detail = DeliveryDetail {
            delivery,
            client_name: None,
            client_location: None,
            total_items: 0,
            total_amount: Decimal::ZERO,
        };

        if let Some(sale_id) = detail.delivery.sale_id {
            let sale = self.find_sale(sale_id).await?;
            let lines = sale_item::Entity::find()
                .filter(sale_item::Column::SaleId.eq(sale_id))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            detail.total_items = lines.len() as u64;
            detail.total_amount = lines.iter().map(|l| l.total_price).sum();
            let client = match sale.client_id {
                Some(client_id) => self.find_client(client_id).await?,
                None => None,
            };
            detail.client_name = client
                .as_ref()
                .map(|c| c.client_name.clone())
                .or(sale.local_client_name);
            detail.client_location = client.map(|c| c.client_location);
        } else if let Some(lease_id) = detail.delivery.lease_id {
            let lease = self.find_lease(lease_id).await?;
            let parts = lease_part_inquiry::Entity::find()
                .filter(lease_part_inquiry::Column::LeaseId.eq(lease_id))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            let accessories = lease_acc_inquiry::Entity::find()
                .filter(lease_acc_inquiry::Column::LeaseId.eq(lease_id))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            detail.total_items = (parts.len() + accessories.len()) as u64;
            detail.total_amount = parts.iter().map(|p| p.amount).sum::<Decimal>()
                + accessories.iter().map(|a| a.amount).sum::<Decimal>();
            if let Some(client) = self.find_client(lease.client_id).await? {
                detail.client_name = Some(client.client_name);
                detail.client_location = Some(client.client_location);
            }
        }

        Ok(detail)
    }

    async fn find(&self, id: Uuid) -> Result<delivery::Model, ServiceError> {
        delivery::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", id)))
    }

    async fn find_sale(&self, id: Uuid) -> Result<sale::Model, ServiceError> {
        sale::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))
    }

    async fn find_lease(&self, id: Uuid) -> Result<lease_contract::Model, ServiceError> {
        lease_contract::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Lease contract {} not found", id)))
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<client::Model>, ServiceError> {
        client::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ItemKind;
    use crate::services::demand_coordinator::NewSaleItem;
    use crate::services::sales::SaleService;
    use crate::services::test_support::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn request(kind: DeliveryType, sale_id: Option<Uuid>, lease_id: Option<Uuid>) -> CreateDeliveryRequest {
        CreateDeliveryRequest {
            delivery_no: None,
            delivery_type: kind,
            sale_id,
            lease_id,
            assigned_to: Uuid::new_v4(),
            delivery_date: None,
            status: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn parent_must_match_the_delivery_type() {
        let ctx = TestContext::new().await;
        let svc = DeliveryService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);

        let err = svc.create(request(DeliveryType::Sale, None, None)).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "Sale is required for Sale deliveries");

        let err = svc.create(request(DeliveryType::Lease, None, None)).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "Lease is required for Lease deliveries");
    }

    #[tokio::test]
    async fn sale_delivery_derives_client_and_totals() {
        let mut ctx = TestContext::new().await;
        let svc = DeliveryService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let sale_id = seed_sale(&ctx.db).await;
        let part = seed_part(&ctx.db, ctx.store, 10).await;
        for quantity in [2, 3] {
            ctx.coordinator
                .create_sale_item(
                    sale_id,
                    NewSaleItem {
                        sale_type: ItemKind::Part,
                        item_id: part,
                        quantity,
                        unit_price: dec!(4.00),
                    },
                )
                .await
                .unwrap();
        }

        let delivery = svc
            .create(request(DeliveryType::Sale, Some(sale_id), None))
            .await
            .unwrap();
        assert!(delivery.delivery.delivery_no.starts_with("DN-"));
        assert_eq!(delivery.delivery.status, "Pending");
        assert_eq!(delivery.client_name.as_deref(), Some("Acme Printing"));
        assert_eq!(delivery.total_items, 2);
        assert_eq!(delivery.total_amount, dec!(20.00));

        ctx.drain_events();
        let moved = svc
            .update(
                delivery.delivery.id,
                UpdateDeliveryRequest {
                    status: Some(DeliveryStatus::InTransit),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.delivery.status, "In Transit");
        assert!(ctx.drain_events().iter().any(|e| matches!(
            e,
            Event::DeliveryStatusChanged { to, .. } if to == "In Transit"
        )));
    }

    #[tokio::test]
    async fn delivered_sale_cannot_be_deleted() {
        let ctx = TestContext::new().await;
        let svc = DeliveryService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let sales = SaleService::new(ctx.db.clone(), ctx.event_sender.clone(), 5);
        let sale_id = seed_sale(&ctx.db).await;
        let delivery = svc
            .create(request(DeliveryType::Sale, Some(sale_id), None))
            .await
            .unwrap();

        let err = sales.delete(sale_id).await.unwrap_err();
        assert_matches!(err, ServiceError::ReferenceIntegrity(_));

        svc.delete(delivery.delivery.id).await.unwrap();
        sales.delete(sale_id).await.unwrap();
    }
}
