use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{DemandKind, ItemRef};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a closed or full channel is logged and swallowed
    /// since the state change it describes is already committed.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "dropping domain event");
        }
    }

    /// Sends a batch in order, logging failures
    pub async fn send_all(&self, events: Vec<Event>) {
        for event in events {
            self.send_or_log(event).await;
        }
    }
}

/// Domain events published after a transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    StockTaken {
        item: ItemRef,
        quantity: i32,
        remaining: i32,
    },
    StockRestored {
        item: ItemRef,
        quantity: i32,
        remaining: i32,
    },
    ItemOutOfStock(ItemRef),
    MachineStatusChanged {
        machine_id: Uuid,
        from: String,
        to: String,
    },
    DemandCreated {
        demand: DemandKind,
        record_id: Uuid,
        item: ItemRef,
        quantity: i32,
    },
    DemandUpdated {
        demand: DemandKind,
        record_id: Uuid,
        item: ItemRef,
        old_quantity: i32,
        new_quantity: i32,
    },
    DemandDeleted {
        demand: DemandKind,
        record_id: Uuid,
        item: ItemRef,
        quantity: i32,
    },
    SaleCreated {
        sale_id: Uuid,
        sale_no: String,
    },
    SaleDeleted(Uuid),
    LeaseCreated {
        lease_id: Uuid,
        lease_no: String,
    },
    LeaseClosed(Uuid),
    LeaseDeleted(Uuid),
    StoreInquiryIssued {
        inquiry_id: Uuid,
        issued_by: Uuid,
    },
    CallCompleted(Uuid),
    DeliveryStatusChanged {
        delivery_id: Uuid,
        from: String,
        to: String,
    },
    MeterReadingRecorded {
        lease_id: Uuid,
        month: String,
    },
}

impl Event {
    /// Stable event name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Event::StockTaken { .. } => "stock_taken",
            Event::StockRestored { .. } => "stock_restored",
            Event::ItemOutOfStock(_) => "item_out_of_stock",
            Event::MachineStatusChanged { .. } => "machine_status_changed",
            Event::DemandCreated { .. } => "demand_created",
            Event::DemandUpdated { .. } => "demand_updated",
            Event::DemandDeleted { .. } => "demand_deleted",
            Event::SaleCreated { .. } => "sale_created",
            Event::SaleDeleted(_) => "sale_deleted",
            Event::LeaseCreated { .. } => "lease_created",
            Event::LeaseClosed(_) => "lease_closed",
            Event::LeaseDeleted(_) => "lease_deleted",
            Event::StoreInquiryIssued { .. } => "store_inquiry_issued",
            Event::CallCompleted(_) => "call_completed",
            Event::DeliveryStatusChanged { .. } => "delivery_status_changed",
            Event::MeterReadingRecorded { .. } => "meter_reading_recorded",
        }
    }
}

/// Drains the event channel and records every event in the log.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::counter!("bititec_events.processed", 1);
        match &event {
            Event::StockTaken {
                item,
                quantity,
                remaining,
            } => info!(%item, quantity, remaining, "stock taken"),
            Event::StockRestored {
                item,
                quantity,
                remaining,
            } => info!(%item, quantity, remaining, "stock restored"),
            Event::ItemOutOfStock(item) => warn!(%item, "item is out of stock"),
            Event::MachineStatusChanged {
                machine_id,
                from,
                to,
            } => info!(%machine_id, %from, %to, "machine status changed"),
            Event::DemandCreated {
                demand,
                record_id,
                item,
                quantity,
            } => info!(%demand, %record_id, %item, quantity, "demand created"),
            Event::DemandUpdated {
                demand,
                record_id,
                item,
                old_quantity,
                new_quantity,
            } => info!(
                %demand,
                %record_id,
                %item,
                old_quantity,
                new_quantity,
                "demand updated"
            ),
            Event::DemandDeleted {
                demand,
                record_id,
                item,
                quantity,
            } => info!(%demand, %record_id, %item, quantity, "demand deleted"),
            Event::SaleCreated { sale_id, sale_no } => {
                info!(%sale_id, %sale_no, "sale created")
            }
            Event::SaleDeleted(sale_id) => info!(%sale_id, "sale deleted"),
            Event::LeaseCreated { lease_id, lease_no } => {
                info!(%lease_id, %lease_no, "lease created")
            }
            Event::LeaseClosed(lease_id) => info!(%lease_id, "lease closed"),
            Event::LeaseDeleted(lease_id) => info!(%lease_id, "lease deleted"),
            Event::StoreInquiryIssued {
                inquiry_id,
                issued_by,
            } => info!(%inquiry_id, %issued_by, "store inquiry issued"),
            Event::CallCompleted(call_id) => info!(%call_id, "call completed"),
            Event::DeliveryStatusChanged {
                delivery_id,
                from,
                to,
            } => info!(%delivery_id, %from, %to, "delivery status changed"),
            Event::MeterReadingRecorded { lease_id, month } => {
                info!(%lease_id, %month, "meter reading recorded")
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let sale_id = Uuid::new_v4();

        sender
            .send_all(vec![
                Event::SaleCreated {
                    sale_id,
                    sale_no: "SN-01/26/12345".into(),
                },
                Event::SaleDeleted(sale_id),
            ])
            .await;

        assert_eq!(rx.recv().await.map(|e| e.name()), Some("sale_created"));
        assert_eq!(rx.recv().await, Some(Event::SaleDeleted(sale_id)));
    }

    #[tokio::test]
    async fn send_to_closed_channel_is_an_error_but_send_or_log_is_not() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::SaleDeleted(Uuid::nil())).await.is_err());
        sender.send_or_log(Event::SaleDeleted(Uuid::nil())).await;
    }
}
