mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

fn part_sale(client_id: Uuid, part_id: Uuid, quantity: i32) -> serde_json::Value {
    json!({
        "sale_type": "Internal",
        "client_id": client_id,
        "items": [{
            "sale_type": "Part",
            "item_id": part_id,
            "quantity": quantity,
            "unit_price": "1200"
        }]
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_sales_never_overdraw() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 5).await;

    let (first, second) = tokio::join!(
        app.as_admin(Method::POST, "/api/v1/sales", Some(part_sale(client, part, 3))),
        app.as_admin(Method::POST, "/api/v1/sales", Some(part_sale(client, part, 3))),
    );

    let mut statuses = vec![first.status, second.status];
    statuses.sort();
    assert_eq!(
        statuses,
        vec![StatusCode::CREATED, StatusCode::UNPROCESSABLE_ENTITY],
        "first: {} second: {}",
        first.body,
        second.body
    );

    let refused = if first.status == StatusCode::UNPROCESSABLE_ENTITY {
        &first
    } else {
        &second
    };
    assert_eq!(
        refused.body["error"],
        "Insufficient stock. Only 2 units available."
    );

    assert_eq!(app.part_quantity(part).await, 2);
    let view = app.part_view(part).await;
    assert_eq!(view["sold_quantity"], 3);
    assert_eq!(view["available_quantity"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_small_sales_account_for_every_unit() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 6).await;

    let requests = (0..10).map(|_| {
        app.as_admin(Method::POST, "/api/v1/sales", Some(part_sale(client, part, 1)))
    });
    let responses = futures::future::join_all(requests).await;

    let created = responses
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    let refused = responses
        .iter()
        .filter(|r| r.status == StatusCode::UNPROCESSABLE_ENTITY)
        .count();
    assert_eq!(created, 6);
    assert_eq!(refused, 4);
    assert_eq!(app.part_quantity(part).await, 0);

    let report = app
        .as_admin(Method::GET, "/api/v1/inventory/reconciliation", None)
        .await;
    assert_eq!(report.body["discrepancies"], json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_machine_sales_sell_it_once() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let machine = app.create_machine(store).await;

    let body = json!({
        "sale_type": "Internal",
        "client_id": client,
        "items": [{
            "sale_type": "Machine",
            "item_id": machine,
            "quantity": 1,
            "unit_price": "350000"
        }]
    });
    let (first, second) = tokio::join!(
        app.as_admin(Method::POST, "/api/v1/sales", Some(body.clone())),
        app.as_admin(Method::POST, "/api/v1/sales", Some(body.clone())),
    );

    let created = [first.status, second.status]
        .iter()
        .filter(|s| **s == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1, "first: {} second: {}", first.body, second.body);
}
