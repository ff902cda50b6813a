mod common;

use axum::http::{Method, StatusCode};
use bititec_api::auth::Role;
use common::{id_of, TestApp};
use serde_json::json;
use test_case::test_case;
use uuid::Uuid;

async fn sale_attempt(app: &TestApp, role: Role) -> StatusCode {
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 5).await;
    let token = app.token_for(role);
    app.request(
        Method::POST,
        "/api/v1/sales",
        Some(json!({
            "sale_type": "Internal",
            "client_id": client,
            "items": [{ "sale_type": "Part", "item_id": part, "quantity": 1, "unit_price": "10" }]
        })),
        Some(&token),
    )
    .await
    .status
}

#[test_case(Role::Director, StatusCode::CREATED ; "director")]
#[test_case(Role::SuperAdmin, StatusCode::CREATED ; "super admin")]
#[test_case(Role::SalesManager, StatusCode::CREATED ; "sales manager")]
#[test_case(Role::SalesMember, StatusCode::CREATED ; "sales member")]
#[test_case(Role::Technician, StatusCode::FORBIDDEN ; "technician")]
#[test_case(Role::InventoryManager, StatusCode::FORBIDDEN ; "inventory manager")]
#[tokio::test]
async fn who_may_record_a_sale(role: Role, expected: StatusCode) {
    let app = TestApp::new().await;
    assert_eq!(sale_attempt(&app, role).await, expected);
}

#[tokio::test]
async fn refused_sale_leaves_stock_alone() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let part = app.create_part(store, 5).await;
    let client = app.create_client().await;
    let token = app.token_for(Role::Technician);

    let res = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "sale_type": "Internal",
                "client_id": client,
                "items": [{ "sale_type": "Part", "item_id": part, "quantity": 2, "unit_price": "10" }]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["code"], "forbidden");
    assert_eq!(app.part_quantity(part).await, 5);
}

#[test_case("/api/v1/parts/00000000-0000-0000-0000-000000000000" ; "part")]
#[test_case("/api/v1/sales" ; "sales")]
#[test_case("/api/v1/inventory/reconciliation" ; "reconciliation")]
#[tokio::test]
async fn requests_without_a_token_are_rejected(uri: &str) {
    let app = TestApp::new().await;
    let res = app.request(Method::GET, uri, None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["code"], "unauthorized");
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let app = TestApp::new().await;
    let res = app
        .request(Method::GET, "/api/v1/sales", None, Some("not-a-jwt"))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;
    let res = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["database"], "up");
}

#[tokio::test]
async fn reading_needs_no_edit_capability() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let part = app.create_part(store, 3).await;
    let token = app.token_for(Role::Technician);

    let res = app
        .request(Method::GET, &format!("/api/v1/parts/{}", part), None, Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .request(
            Method::PATCH,
            &format!("/api/v1/parts/{}", part),
            Some(json!({ "name": "Drum unit" })),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn requesters_may_issue_but_not_reject_their_requisition() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let part = app.create_part(store, 4).await;
    let call = app.create_walk_in_call().await;

    let technician = Uuid::new_v4();
    let token = app.token_for_user(technician, Role::Technician);
    let res = app
        .request(
            Method::POST,
            "/api/v1/store-inquiries",
            Some(json!({
                "service_call_id": call,
                "part_name": "Fuser unit",
                "part_id": part,
                "quantity": 1
            })),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["requested_by"], json!(technician));
    let uri = format!("/api/v1/store-inquiries/{}", id_of(&res.body));

    let stranger = app.token_for(Role::Technician);
    let res = app
        .request(Method::PATCH, &uri, Some(json!({ "is_issued": true })), Some(&stranger))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .request(Method::PATCH, &uri, Some(json!({ "status": "Rejected" })), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .request(Method::PATCH, &uri, Some(json!({ "quantity": 2 })), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["quantity"], 2);

    let res = app
        .request(Method::PATCH, &uri, Some(json!({ "is_issued": true })), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["is_issued"], true);
    assert_eq!(res.body["status"], "Issued");
    assert_eq!(res.body["issued_by"], json!(technician));

    let store_keeper = app.token_for(Role::InventoryManager);
    let res = app
        .request(Method::PATCH, &uri, Some(json!({ "status": "Rejected" })), Some(&store_keeper))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["status"], "Rejected");
    assert_eq!(res.body["is_issued"], false);
}

#[tokio::test]
async fn assignee_may_update_their_delivery() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 2).await;
    let sale = app
        .as_admin(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "sale_type": "Internal",
                "client_id": client,
                "items": [{ "sale_type": "Part", "item_id": part, "quantity": 1, "unit_price": "10" }]
            })),
        )
        .await;
    assert_eq!(sale.status, StatusCode::CREATED, "{}", sale.body);

    let driver = Uuid::new_v4();
    let delivery = app
        .as_admin(
            Method::POST,
            "/api/v1/deliveries",
            Some(json!({
                "delivery_type": "Sale",
                "sale_id": id_of(&sale.body),
                "assigned_to": driver
            })),
        )
        .await;
    assert_eq!(delivery.status, StatusCode::CREATED, "{}", delivery.body);
    let uri = format!("/api/v1/deliveries/{}", id_of(&delivery.body));

    let driver_token = app.token_for_user(driver, Role::Technician);
    let res = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "status": "Delivered" })),
            Some(&driver_token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["status"], "Delivered");

    let other_token = app.token_for(Role::Technician);
    let res = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "status": "Failed" })),
            Some(&other_token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .request(Method::DELETE, &uri, None, Some(&other_token))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn store_keepers_curate_the_type_catalog() {
    let app = TestApp::new().await;
    let entry = json!({
        "category": "Part",
        "name": "Fuser",
        "type_name": "Heat roller",
        "brand": "Kyocera",
        "color": "Black"
    });

    let technician = app.token_for(Role::Technician);
    let res = app
        .request(Method::POST, "/api/v1/item-types", Some(entry.clone()), Some(&technician))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let keeper = app.token_for(Role::InventoryManager);
    let res = app
        .request(Method::POST, "/api/v1/item-types", Some(entry.clone()), Some(&keeper))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

    let res = app
        .request(Method::POST, "/api/v1/item-types", Some(entry), Some(&keeper))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let parts = app
        .request(Method::GET, "/api/v1/item-types?category=Part", None, Some(&technician))
        .await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(parts.body.as_array().map(Vec::len), Some(1));
    assert_eq!(parts.body[0]["name"], "Fuser");
}
