//! Monthly meter readings of leased machines.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::leases::first_of_month;
use crate::entities::{lease_contract, meter_reading};
use crate::errors::{is_unique_violation, ServiceError};
use crate::events::{Event, EventSender};

const DUPLICATE_MONTH: &str = "Meter reading for this month already exists";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMeterReadingRequest {
    pub lease_id: Uuid,
    /// Defaults to the lease's machine
    pub machine_id: Option<Uuid>,
    /// Any day of the month being recorded
    pub month: chrono::NaiveDate,
    #[validate(range(min = 0))]
    pub meter_reading: i64,
}

#[derive(Clone)]
pub struct MeterReadingService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl MeterReadingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, req), fields(lease_id = %req.lease_id))]
    pub async fn create(
        &self,
        req: CreateMeterReadingRequest,
    ) -> Result<meter_reading::Model, ServiceError> {
        req.validate()?;
        let db = &*self.db;
        let lease = lease_contract::Entity::find_by_id(req.lease_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Lease contract {} not found", req.lease_id))
            })?;

        let month = first_of_month(req.month);
        let taken = meter_reading::Entity::find()
            .filter(meter_reading::Column::LeaseId.eq(lease.id))
            .filter(meter_reading::Column::Month.eq(month))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if taken.is_some() {
            return Err(ServiceError::ValidationError(DUPLICATE_MONTH.to_string()));
        }

        let reading = meter_reading::ActiveModel {
            lease_id: Set(lease.id),
            machine_id: Set(req.machine_id.unwrap_or(lease.item_id)),
            month: Set(month),
            meter_reading: Set(req.meter_reading),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::ValidationError(DUPLICATE_MONTH.to_string())
            } else {
                ServiceError::db_error(err)
            }
        })?;

        let label = month.format("%Y-%m").to_string();
        info!(reading_id = %reading.id, month = %label, "meter reading recorded");
        self.event_sender
            .send_or_log(Event::MeterReadingRecorded {
                lease_id: lease.id,
                month: label,
            })
            .await;
        Ok(reading)
    }

    /// Readings of one lease, newest month first
    pub async fn list_for_lease(
        &self,
        lease_id: Uuid,
    ) -> Result<Vec<meter_reading::Model>, ServiceError> {
        meter_reading::Entity::find()
            .filter(meter_reading::Column::LeaseId.eq(lease_id))
            .order_by_desc(meter_reading::Column::Month)
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
    use chrono::NaiveDate;

    #[tokio::test]
    async fn month_is_normalised_and_unique_per_lease() {
        let ctx = TestContext::new().await;
        let svc = MeterReadingService::new(ctx.db.clone(), ctx.event_sender.clone());
        let lease_id = seed_lease(&ctx.db, ctx.store, true).await;

        let first = svc
            .create(CreateMeterReadingRequest {
                lease_id,
                machine_id: None,
                month: NaiveDate::from_ymd_opt(2026, 3, 17).unwrap(),
                meter_reading: 12_000,
            })
            .await
            .unwrap();
        assert_eq!(first.month, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        let err = svc
            .create(CreateMeterReadingRequest {
                lease_id,
                machine_id: None,
                month: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
                meter_reading: 12_500,
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == DUPLICATE_MONTH);

        svc.create(CreateMeterReadingRequest {
            lease_id,
            machine_id: None,
            month: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            meter_reading: 13_100,
        })
        .await
        .unwrap();

        let listed = svc.list_for_lease(lease_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].month, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }
}
