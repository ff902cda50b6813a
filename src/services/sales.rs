//! Sales with their lines.
//!
//! A sale and all of its lines are written in one transaction; each line
//! goes through the coordinator, so a single short item rolls back the whole
//! sale. Updates reconcile the submitted lines against the stored ones.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::demand_coordinator::{
    create_sale_item_in, delete_sale_item_in, parent_delete_error, update_sale_item_in,
    validate_non_negative, DemandPatch, NewSaleItem,
};
use super::document_numbers::{insert_numbered, DocumentPrefix};
use super::stock_ledger::StockLevel;
use crate::db::in_transaction;
use crate::entities::sale::SaleType;
use crate::entities::{client, delivery, sale, sale_item, store_inquiry, ItemKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    /// Preset sale number; generated when absent
    pub sale_no: Option<String>,
    pub sale_type: SaleType,
    pub client_id: Option<Uuid>,
    /// Local sales only: reused or created together with `client_location`
    pub client_name: Option<String>,
    pub client_location: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub add_vat: bool,
    pub store_inquiry_id: Option<Uuid>,
    #[serde(default)]
    #[validate]
    pub items: Vec<NewSaleItem>,
}

/// A submitted line. Lines with an `id` update the stored line, lines
/// without one are added.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaleLineInput {
    pub id: Option<Uuid>,
    pub sale_type: ItemKind,
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSaleRequest {
    pub sale_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub add_vat: Option<bool>,
    /// Full list of lines after the update; stored lines not listed are
    /// deleted. Leave out to keep the lines as they are.
    pub items: Option<Vec<SaleLineInput>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
    /// Sum of the line totals
    pub total_price: Decimal,
    pub items_count: usize,
    /// Stock of every item this request touched
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stock: Vec<StockLevel>,
}

impl SaleDetail {
    fn new(sale: sale::Model, items: Vec<sale_item::Model>, stock: Vec<StockLevel>) -> Self {
        let total_price = items.iter().map(|i| i.total_price).sum();
        let items_count = items.len();
        Self {
            sale,
            items,
            total_price,
            items_count,
            stock,
        }
    }
}

/// Who the sale is for, settled before the transaction opens
enum Buyer {
    Existing(Uuid),
    /// Local client not on file yet
    New { name: String, location: String },
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Splits submitted lines into updates, additions and deletions.
fn plan_lines(
    stored: &[sale_item::Model],
    submitted: Vec<SaleLineInput>,
) -> Result<LinePlan, ServiceError> {
    let by_id: HashMap<Uuid, &sale_item::Model> = stored.iter().map(|l| (l.id, l)).collect();
    let mut kept = HashSet::new();
    let mut plan = LinePlan::default();

    for line in submitted {
        line.validate()?;
        match line.id {
            Some(id) => {
                let existing = by_id.get(&id).ok_or_else(|| {
                    ServiceError::NotFound(format!("Sale item {} not found on this sale", id))
                })?;
                if !kept.insert(id) {
                    return Err(ServiceError::ValidationError(format!(
                        "Sale item {} is listed twice",
                        id
                    )));
                }
                let same_item = existing
                    .item_ref()
                    .map_or(false, |r| r.kind == line.sale_type && r.id == line.item_id);
                if !same_item {
                    return Err(ServiceError::ValidationError(format!(
                        "Sale item {} cannot move to another item; remove it and add a new line",
                        id
                    )));
                }
                plan.update.push((
                    (*existing).clone(),
                    DemandPatch {
                        quantity: Some(line.quantity),
                        unit_price: Some(line.unit_price),
                        ..Default::default()
                    },
                ));
            }
            None => plan.create.push(NewSaleItem {
                sale_type: line.sale_type,
                item_id: line.item_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            }),
        }
    }

    plan.delete = stored
        .iter()
        .filter(|l| !kept.contains(&l.id))
        .cloned()
        .collect();
    Ok(plan)
}

#[derive(Default)]
struct LinePlan {
    update: Vec<(sale_item::Model, DemandPatch)>,
    create: Vec<NewSaleItem>,
    delete: Vec<sale_item::Model>,
}

#[derive(Clone)]
pub struct SaleService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    numbering_attempts: u32,
}

impl SaleService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, numbering_attempts: u32) -> Self {
        Self {
            db,
            event_sender,
            numbering_attempts,
        }
    }

    #[instrument(skip(self, req), fields(sale_type = ?req.sale_type, lines = req.items.len()))]
    pub async fn create(&self, req: CreateSaleRequest) -> Result<SaleDetail, ServiceError> {
        req.validate()?;
        let buyer = self.resolve_buyer(&req).await?;
        if let Some(inquiry_id) = req.store_inquiry_id {
            store_inquiry::Entity::find_by_id(inquiry_id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Store inquiry {} not found", inquiry_id))
                })?;
        }

        let local_client_name = match (&req.sale_type, &buyer) {
            (SaleType::Local, Buyer::New { name, .. }) => Some(name.clone()),
            (SaleType::Local, Buyer::Existing(_)) => non_blank(req.client_name.clone()),
            _ => None,
        };
        let template = sale::ActiveModel {
            sale_type: Set(req.sale_type.as_str().to_string()),
            local_client_name: Set(local_client_name),
            sale_date: Set(req.sale_date.unwrap_or_else(|| Utc::now().date_naive())),
            notes: Set(req.notes),
            add_vat: Set(req.add_vat),
            store_inquiry_id: Set(req.store_inquiry_id),
            ..Default::default()
        };
        let buyer = Arc::new(buyer);
        let lines = Arc::new(req.items);

        let (detail, events) = insert_numbered(
            DocumentPrefix::Sale,
            req.sale_no,
            self.numbering_attempts,
            |number| {
                let db = self.db.clone();
                let buyer = buyer.clone();
                let lines = lines.clone();
                let mut model = template.clone();
                model.sale_no = Set(number);
                async move {
                    in_transaction(&db, move |txn| {
                        Box::pin(async move {
                            let client_id = match &*buyer {
                                Buyer::Existing(id) => *id,
                                Buyer::New { name, location } => {
                                    client::ActiveModel {
                                        client_name: Set(name.clone()),
                                        client_location: Set(location.clone()),
                                        ..Default::default()
                                    }
                                    .insert(txn)
                                    .await
                                    .map_err(ServiceError::db_error)?
                                    .id
                                }
                            };
                            model.client_id = Set(Some(client_id));
                            let sale = model.insert(txn).await.map_err(ServiceError::db_error)?;

                            let mut events = Vec::new();
                            let mut items = Vec::with_capacity(lines.len());
                            let mut stock = Vec::with_capacity(lines.len());
                            for line in lines.iter() {
                                let outcome =
                                    create_sale_item_in(txn, sale.id, line, &mut events).await?;
                                items.push(outcome.record);
                                stock.push(outcome.stock);
                            }
                            events.push(Event::SaleCreated {
                                sale_id: sale.id,
                                sale_no: sale.sale_no.clone(),
                            });
                            Ok((SaleDetail::new(sale, items, stock), events))
                        })
                    })
                    .await
                }
            },
        )
        .await?;

        metrics::counter!("bititec_sales.created", 1);
        info!(
            sale_id = %detail.sale.id,
            sale_no = %detail.sale.sale_no,
            total = %detail.total_price,
            "sale created"
        );
        self.event_sender.send_all(events).await;
        Ok(detail)
    }

    pub async fn get(&self, id: Uuid) -> Result<SaleDetail, ServiceError> {
        let sale = self.find(id).await?;
        let items = self.lines(id).await?;
        Ok(SaleDetail::new(sale, items, Vec::new()))
    }

    pub async fn list(&self, limit: u64, offset: u64) -> Result<Vec<SaleDetail>, ServiceError> {
        let sales = sale::Entity::find()
            .order_by_desc(sale::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        let mut out = Vec::with_capacity(sales.len());
        for sale in sales {
            let items = self.lines(sale.id).await?;
            out.push(SaleDetail::new(sale, items, Vec::new()));
        }
        Ok(out)
    }

    /// Edits header fields and, when `items` is given, reconciles the lines
    /// in the same transaction.
    #[instrument(skip(self, req))]
    pub async fn update(&self, id: Uuid, req: UpdateSaleRequest) -> Result<SaleDetail, ServiceError> {
        req.validate()?;
        let existing = self.find(id).await?;
        let stored = self.lines(id).await?;
        let plan = match req.items {
            Some(submitted) => plan_lines(&stored, submitted)?,
            None => LinePlan::default(),
        };

        let mut header: sale::ActiveModel = existing.into();
        if let Some(sale_date) = req.sale_date {
            header.sale_date = Set(sale_date);
        }
        if let Some(notes) = req.notes {
            header.notes = Set(Some(notes));
        }
        if let Some(add_vat) = req.add_vat {
            header.add_vat = Set(add_vat);
        }

        let (stock, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                header.update(txn).await.map_err(ServiceError::db_error)?;

                let mut events = Vec::new();
                let mut stock = Vec::new();
                for line in &plan.delete {
                    stock.push(delete_sale_item_in(txn, line, &mut events).await?);
                }
                for (line, patch) in &plan.update {
                    stock.push(update_sale_item_in(txn, line, patch, &mut events).await?.stock);
                }
                for line in &plan.create {
                    stock.push(create_sale_item_in(txn, id, line, &mut events).await?.stock);
                }
                Ok((stock, events))
            })
        })
        .await?;

        self.event_sender.send_all(events).await;
        let sale = self.find(id).await?;
        let items = self.lines(id).await?;
        Ok(SaleDetail::new(sale, items, stock))
    }

    /// Deletes the sale after restoring every line. Refused while a
    /// delivery points at it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<Vec<StockLevel>, ServiceError> {
        let existing = self.find(id).await?;
        let deliveries = delivery::Entity::find()
            .filter(delivery::Column::SaleId.eq(id))
            .count(&*self.db)
            .await?;
        if deliveries > 0 {
            return Err(ServiceError::ReferenceIntegrity(format!(
                "Cannot delete sale {}: still referenced by {} delivery(ies)",
                existing.sale_no, deliveries
            )));
        }
        let lines = self.lines(id).await?;

        let (stock, events) = in_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let mut events = Vec::new();
                let mut stock = Vec::with_capacity(lines.len());
                for line in &lines {
                    stock.push(delete_sale_item_in(txn, line, &mut events).await?);
                }
                sale::Entity::delete_by_id(existing.id)
                    .exec(txn)
                    .await
                    .map_err(parent_delete_error(format!("Sale {}", existing.sale_no)))?;
                events.push(Event::SaleDeleted(existing.id));
                Ok((stock, events))
            })
        })
        .await?;

        info!(sale_id = %id, restored = stock.len(), "sale deleted");
        self.event_sender.send_all(events).await;
        Ok(stock)
    }

    async fn resolve_buyer(&self, req: &CreateSaleRequest) -> Result<Buyer, ServiceError> {
        if let Some(client_id) = req.client_id {
            client::Entity::find_by_id(client_id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::NotFound(format!("Client {} not found", client_id)))?;
            return Ok(Buyer::Existing(client_id));
        }

        match req.sale_type {
            SaleType::Internal => Err(ServiceError::ValidationError(
                "Internal sales require client_id".to_string(),
            )),
            SaleType::Local => {
                let name = non_blank(req.client_name.clone());
                let location = non_blank(req.client_location.clone());
                let (name, location) = match (name, location) {
                    (Some(n), Some(l)) => (n, l),
                    _ => {
                        return Err(ServiceError::ValidationError(
                            "Local sales require client_id or both client_name and client_location"
                                .to_string(),
                        ))
                    }
                };
                let found = client::Entity::find()
                    .filter(client::Column::ClientName.eq(name.as_str()))
                    .filter(client::Column::ClientLocation.eq(location.as_str()))
                    .one(&*self.db)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(match found {
                    Some(c) => Buyer::Existing(c.id),
                    None => Buyer::New { name, location },
                })
            }
        }
    }

    async fn find(&self, id: Uuid) -> Result<sale::Model, ServiceError> {
        sale::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))
    }

    async fn lines(&self, sale_id: Uuid) -> Result<Vec<sale_item::Model>, ServiceError> {
        sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .order_by_asc(sale_item::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn service(ctx: &TestContext) -> SaleService {
        SaleService::new(ctx.db.clone(), ctx.event_sender.clone(), 5)
    }

    fn line(kind: ItemKind, item_id: Uuid, quantity: i32) -> NewSaleItem {
        NewSaleItem {
            sale_type: kind,
            item_id,
            quantity,
            unit_price: dec!(10.00),
        }
    }

    fn local_sale(items: Vec<NewSaleItem>) -> CreateSaleRequest {
        CreateSaleRequest {
            sale_no: None,
            sale_type: SaleType::Local,
            client_id: None,
            client_name: Some("Counter Buyer".into()),
            client_location: Some("Thika".into()),
            sale_date: None,
            notes: None,
            add_vat: false,
            store_inquiry_id: None,
            items,
        }
    }

    #[tokio::test]
    async fn sale_and_lines_commit_together() {
        let mut ctx = TestContext::new().await;
        let svc = service(&ctx);
        let part = seed_part(&ctx.db, ctx.store, 5).await;
        let acc = seed_accessory(&ctx.db, ctx.store, 1).await;

        let err = svc
            .create(local_sale(vec![
                line(ItemKind::Part, part, 2),
                line(ItemKind::Accessory, acc, 2),
            ]))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InsufficientStock(_));
        assert_eq!(part_quantity(&ctx.db, part).await, 5);
        assert!(sale::Entity::find().all(&*ctx.db).await.unwrap().is_empty());
        assert!(client::Entity::find().all(&*ctx.db).await.unwrap().is_empty());
        ctx.drain_events();

        let sale = svc
            .create(local_sale(vec![
                line(ItemKind::Part, part, 2),
                line(ItemKind::Accessory, acc, 1),
            ]))
            .await
            .unwrap();
        assert!(sale.sale.sale_no.starts_with("SN-"));
        assert_eq!(sale.items_count, 2);
        assert_eq!(sale.total_price, dec!(30.00));
        assert_eq!(sale.sale.local_client_name.as_deref(), Some("Counter Buyer"));
        assert_eq!(part_quantity(&ctx.db, part).await, 3);
        assert!(ctx
            .drain_events()
            .iter()
            .any(|e| matches!(e, Event::SaleCreated { .. })));
    }

    #[tokio::test]
    async fn local_client_is_reused_by_name_and_location() {
        let ctx = TestContext::new().await;
        let svc = service(&ctx);
        let first = svc.create(local_sale(vec![])).await.unwrap();
        let second = svc.create(local_sale(vec![])).await.unwrap();
        assert_eq!(first.sale.client_id, second.sale.client_id);
        assert_eq!(client::Entity::find().count(&*ctx.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn internal_sale_requires_a_client() {
        let ctx = TestContext::new().await;
        let svc = service(&ctx);
        let mut req = local_sale(vec![]);
        req.sale_type = SaleType::Internal;
        assert_matches!(svc.create(req).await, Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn update_reconciles_lines() {
        let ctx = TestContext::new().await;
        let svc = service(&ctx);
        let kept = seed_part(&ctx.db, ctx.store, 10).await;
        let dropped = seed_part(&ctx.db, ctx.store, 10).await;
        let added = seed_part(&ctx.db, ctx.store, 10).await;
        let sale = svc
            .create(local_sale(vec![
                line(ItemKind::Part, kept, 4),
                line(ItemKind::Part, dropped, 3),
            ]))
            .await
            .unwrap();
        let kept_line = sale
            .items
            .iter()
            .find(|l| l.part_id == Some(kept))
            .unwrap()
            .id;

        let updated = svc
            .update(
                sale.sale.id,
                UpdateSaleRequest {
                    items: Some(vec![
                        SaleLineInput {
                            id: Some(kept_line),
                            sale_type: ItemKind::Part,
                            item_id: kept,
                            quantity: 6,
                            unit_price: dec!(10.00),
                        },
                        SaleLineInput {
                            id: None,
                            sale_type: ItemKind::Part,
                            item_id: added,
                            quantity: 1,
                            unit_price: dec!(5.00),
                        },
                    ]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items_count, 2);
        assert_eq!(updated.total_price, dec!(65.00));
        assert_eq!(part_quantity(&ctx.db, kept).await, 4);
        assert_eq!(part_quantity(&ctx.db, dropped).await, 10);
        assert_eq!(part_quantity(&ctx.db, added).await, 9);
    }

    #[tokio::test]
    async fn deleting_a_sale_restores_every_line() {
        let ctx = TestContext::new().await;
        let svc = service(&ctx);
        let part = seed_part(&ctx.db, ctx.store, 3).await;
        let machine = seed_machine(&ctx.db, ctx.store, "S-1").await;
        let sale = svc
            .create(local_sale(vec![
                line(ItemKind::Part, part, 3),
                line(ItemKind::Machine, machine, 1),
            ]))
            .await
            .unwrap();
        assert_eq!(part_quantity(&ctx.db, part).await, 0);

        let restored = svc.delete(sale.sale.id).await.unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(part_quantity(&ctx.db, part).await, 3);
        assert!(restored.iter().any(|s| s.status == "Available" && s.item_id == machine));
        assert_matches!(svc.get(sale.sale.id).await, Err(ServiceError::NotFound(_)));
    }
}
