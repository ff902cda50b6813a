use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bititec API",
        version = "1.0.0",
        description = r#"
# Bititec inventory API

Stock, sales, leases and field service for an equipment dealer.

Every part and accessory carries an on-hand counter. Sale items, lease
part inquiries and lease accessory inquiries draw against that counter in
the same transaction that records them; deleting or shrinking a record gives
the units back. A request that would take more than is on the shelf fails
with HTTP 422 and leaves everything unchanged.

## Authentication

Requests carry a bearer token issued by the identity service:

```
Authorization: Bearer <jwt>
```

## Errors

```json
{
  "error": "Insufficient stock. Only 2 units available.",
  "code": "insufficient_stock",
  "request_id": "4c1f0c1e-3f7d-4e0b-9a43-0d4f4b7f2d11",
  "timestamp": "2026-03-01T09:30:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "stores", description = "Stores holding stock"),
        (name = "clients", description = "Dealer clients"),
        (name = "client-machines", description = "Customer machines brought in for service"),
        (name = "item-types", description = "Machine, part and accessory type catalogs"),
        (name = "inventory", description = "Machines, parts, accessories and reconciliation"),
        (name = "sales", description = "Sales and their lines"),
        (name = "leases", description = "Lease contracts, fitted parts and meter readings"),
        (name = "calls", description = "Service calls"),
        (name = "store-inquiries", description = "Part requisitions raised from calls"),
        (name = "deliveries", description = "Deliveries of sold or leased goods")
    ),
    paths(
        crate::handlers::health::health_check,

        crate::handlers::stores::create_store,
        crate::handlers::stores::list_stores,
        crate::handlers::stores::get_store,
        crate::handlers::stores::delete_store,
        crate::handlers::stores::create_client,
        crate::handlers::stores::list_clients,
        crate::handlers::stores::get_client,
        crate::handlers::stores::delete_client,

        crate::handlers::catalogs::create_client_machine,
        crate::handlers::catalogs::list_client_machines,
        crate::handlers::catalogs::get_client_machine,
        crate::handlers::catalogs::update_client_machine,
        crate::handlers::catalogs::delete_client_machine,
        crate::handlers::catalogs::create_item_type,
        crate::handlers::catalogs::list_item_types,
        crate::handlers::catalogs::get_item_type,
        crate::handlers::catalogs::update_item_type,
        crate::handlers::catalogs::delete_item_type,

        crate::handlers::inventory::create_part,
        crate::handlers::inventory::get_part,
        crate::handlers::inventory::update_part,
        crate::handlers::inventory::delete_part,
        crate::handlers::inventory::create_accessory,
        crate::handlers::inventory::get_accessory,
        crate::handlers::inventory::update_accessory,
        crate::handlers::inventory::delete_accessory,
        crate::handlers::inventory::create_machine,
        crate::handlers::inventory::get_machine,
        crate::handlers::inventory::update_machine,
        crate::handlers::inventory::delete_machine,
        crate::handlers::inventory::reconciliation,

        crate::handlers::sales::create_sale,
        crate::handlers::sales::list_sales,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::update_sale,
        crate::handlers::sales::delete_sale,
        crate::handlers::sales::add_sale_item,
        crate::handlers::sales::update_sale_item,
        crate::handlers::sales::delete_sale_item,

        crate::handlers::leases::create_lease,
        crate::handlers::leases::list_leases,
        crate::handlers::leases::get_lease,
        crate::handlers::leases::update_lease,
        crate::handlers::leases::delete_lease,
        crate::handlers::leases::list_meter_readings,
        crate::handlers::leases::missing_readings,
        crate::handlers::leases::create_meter_reading,
        crate::handlers::leases::create_lease_part_inquiry,
        crate::handlers::leases::update_lease_part_inquiry,
        crate::handlers::leases::delete_lease_part_inquiry,
        crate::handlers::leases::create_lease_acc_inquiry,
        crate::handlers::leases::update_lease_acc_inquiry,
        crate::handlers::leases::delete_lease_acc_inquiry,

        crate::handlers::calls::create_call,
        crate::handlers::calls::list_calls,
        crate::handlers::calls::get_call,
        crate::handlers::calls::update_call,
        crate::handlers::calls::set_approval,
        crate::handlers::calls::delete_call,
        crate::handlers::calls::list_call_store_inquiries,
        crate::handlers::calls::create_store_inquiry,
        crate::handlers::calls::get_store_inquiry,
        crate::handlers::calls::update_store_inquiry,
        crate::handlers::calls::delete_store_inquiry,

        crate::handlers::deliveries::create_delivery,
        crate::handlers::deliveries::list_deliveries,
        crate::handlers::deliveries::get_delivery,
        crate::handlers::deliveries::update_delivery,
        crate::handlers::deliveries::delete_delivery,
    ),
    components(
        schemas(
            crate::entities::ItemKind,
            crate::entities::StockStatus,
            crate::services::stock_ledger::StockLevel,
            crate::services::stock_aggregator::StockView,
            crate::handlers::common::DeletedWithStock,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_stock_endpoints() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Bititec API"));
        assert!(json.contains("/api/v1/sales/{id}/items"));
        assert!(json.contains("/api/v1/inventory/reconciliation"));
        assert!(json.contains("/api/v1/client-machines/{id}"));
        assert!(json.contains("insufficient_stock") || json.contains("ErrorResponse"));
    }
}
