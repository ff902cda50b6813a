mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, TestApp};
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

fn document_number() -> Regex {
    Regex::new(r"^(TN|LN|SN|DN)-\d{2}/\d{2}/\d{5}$").unwrap()
}

async fn sale_of_one_part(app: &TestApp, client: Uuid, part: Uuid) -> serde_json::Value {
    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "sale_type": "Internal",
                "client_id": client,
                "items": [{ "sale_type": "Part", "item_id": part, "quantity": 1, "unit_price": "900" }]
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body
}

#[tokio::test]
async fn generated_numbers_follow_the_document_format() {
    let app = TestApp::new().await;
    let pattern = document_number();
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 3).await;
    let machine = app.create_machine(store).await;

    let call = app
        .as_admin(Method::GET, &format!("/api/v1/calls/{}", app.create_walk_in_call().await), None)
        .await;
    let ticket = call.body["ticket_no"].as_str().unwrap();
    assert!(pattern.is_match(ticket) && ticket.starts_with("TN-"), "{}", ticket);

    let lease = app
        .as_admin(
            Method::GET,
            &format!("/api/v1/leases/{}", app.create_lease(client, machine, store).await),
            None,
        )
        .await;
    let lease_no = lease.body["lease_no"].as_str().unwrap();
    assert!(pattern.is_match(lease_no) && lease_no.starts_with("LN-"), "{}", lease_no);

    let sale = sale_of_one_part(&app, client, part).await;
    let sale_no = sale["sale_no"].as_str().unwrap();
    assert!(pattern.is_match(sale_no) && sale_no.starts_with("SN-"), "{}", sale_no);

    let delivery = app
        .as_admin(
            Method::POST,
            "/api/v1/deliveries",
            Some(json!({
                "delivery_type": "Sale",
                "sale_id": id_of(&sale),
                "assigned_to": Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(delivery.status, StatusCode::CREATED, "{}", delivery.body);
    let delivery_no = delivery.body["delivery_no"].as_str().unwrap();
    assert!(pattern.is_match(delivery_no) && delivery_no.starts_with("DN-"), "{}", delivery_no);
}

#[tokio::test]
async fn preset_numbers_are_unique() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 5).await;

    let body = json!({
        "sale_no": "SN-10/26/12345",
        "sale_type": "Internal",
        "client_id": client,
        "items": [{ "sale_type": "Part", "item_id": part, "quantity": 1, "unit_price": "10" }]
    });
    let first = app.as_admin(Method::POST, "/api/v1/sales", Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    assert_eq!(first.body["sale_no"], "SN-10/26/12345");

    let second = app.as_admin(Method::POST, "/api/v1/sales", Some(body)).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(app.part_quantity(part).await, 4);
}

#[tokio::test]
async fn both_sign_offs_complete_a_call() {
    let app = TestApp::new().await;
    let call = app.create_walk_in_call().await;
    let uri = format!("/api/v1/calls/{}/approval", call);

    let res = app
        .as_admin(
            Method::POST,
            &uri,
            Some(json!({ "field": "technician_manager_approval", "value": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["technician_manager_approval"], true);
    assert_ne!(res.body["status"], "Complete");

    let res = app
        .as_admin(
            Method::POST,
            &uri,
            Some(json!({ "field": "client_verification", "value": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "Complete");
}

#[tokio::test]
async fn walk_in_call_needs_its_machine_details() {
    let app = TestApp::new().await;
    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/calls",
            Some(json!({
                "contract_type": "WalkIn",
                "client_name": "Counter customer",
                "reported_by": "Front desk",
                "fault_reported": "Streaks on copies"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "validation_error");
}

#[tokio::test]
async fn delivery_parent_must_match_its_type() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let part = app.create_part(store, 2).await;
    let machine = app.create_machine(store).await;
    let sale = id_of(&sale_of_one_part(&app, client, part).await);
    let lease = app.create_lease(client, machine, store).await;

    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/deliveries",
            Some(json!({ "delivery_type": "Sale", "assigned_to": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/deliveries",
            Some(json!({
                "delivery_type": "Lease",
                "lease_id": lease,
                "sale_id": sale,
                "assigned_to": Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/deliveries",
            Some(json!({
                "delivery_type": "Sale",
                "sale_id": Uuid::new_v4(),
                "assigned_to": Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/deliveries",
            Some(json!({
                "delivery_type": "Sale",
                "sale_id": sale,
                "assigned_to": Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["status"], "Pending");
    assert_eq!(res.body["total_items"], 1);
}

#[tokio::test]
async fn deactivating_a_lease_frees_its_machine() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let machine = app.create_machine(store).await;
    let lease = app.create_lease(client, machine, store).await;

    let detail = app
        .as_admin(Method::GET, &format!("/api/v1/machines/{}", machine), None)
        .await;
    assert_eq!(detail.body["status"], "Leased");
    assert_eq!(detail.body["active_lease_id"], json!(lease));

    let other_client = app.create_client().await;
    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/leases",
            Some(json!({
                "client_id": other_client,
                "item_id": machine,
                "store_id": store,
                "from_date": "2026-02-01",
                "to_date": "2026-08-31",
                "contract_type": "Rental"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .as_admin(
            Method::PATCH,
            &format!("/api/v1/leases/{}", lease),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["is_active"], false);

    let detail = app
        .as_admin(Method::GET, &format!("/api/v1/machines/{}", machine), None)
        .await;
    assert_eq!(detail.body["status"], "Available");
    assert!(detail.body["active_lease_id"].is_null());

    let active = app
        .as_admin(Method::GET, "/api/v1/leases?active_only=true", None)
        .await;
    assert_eq!(active.body, json!([]));
}

#[tokio::test]
async fn lease_period_must_be_ordered() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let machine = app.create_machine(store).await;

    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/leases",
            Some(json!({
                "client_id": client,
                "item_id": machine,
                "store_id": store,
                "from_date": "2026-06-01",
                "to_date": "2026-01-31",
                "contract_type": "Lease"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let detail = app
        .as_admin(Method::GET, &format!("/api/v1/machines/{}", machine), None)
        .await;
    assert_eq!(detail.body["status"], "Available");
}

#[tokio::test]
async fn meter_readings_are_one_per_month() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let client = app.create_client().await;
    let machine = app.create_machine(store).await;

    let lease = app
        .as_admin(
            Method::POST,
            "/api/v1/leases",
            Some(json!({
                "client_id": client,
                "item_id": machine,
                "store_id": store,
                "from_date": "2024-01-15",
                "to_date": "2024-06-30",
                "contract_type": "Maintenance"
            })),
        )
        .await;
    assert_eq!(lease.status, StatusCode::CREATED, "{}", lease.body);
    let lease = id_of(&lease.body);

    let reading = |month: &str, value: i64| {
        json!({ "lease_id": lease, "month": month, "meter_reading": value })
    };

    let res = app
        .as_admin(Method::POST, "/api/v1/meter-readings", Some(reading("2024-03-10", 12_500)))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["month"], "2024-03-01");
    assert_eq!(res.body["machine_id"], json!(machine));

    let res = app
        .as_admin(Method::POST, "/api/v1/meter-readings", Some(reading("2024-03-28", 13_100)))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.body["error"],
        "Meter reading for this month already exists"
    );

    let res = app
        .as_admin(Method::POST, "/api/v1/meter-readings", Some(reading("2024-04-02", 14_000)))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let missing = app
        .as_admin(
            Method::GET,
            &format!("/api/v1/leases/{}/missing-readings", lease),
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::OK);
    assert_eq!(missing.body["lease_id"], json!(lease));
    assert_eq!(
        missing.body["months"],
        json!(["2024-01", "2024-02", "2024-05", "2024-06"])
    );

    let readings = app
        .as_admin(
            Method::GET,
            &format!("/api/v1/leases/{}/meter-readings", lease),
            None,
        )
        .await;
    assert_eq!(readings.body.as_array().map(Vec::len), Some(2));
    assert_eq!(readings.body[0]["month"], "2024-04-01");
}

#[tokio::test]
async fn issuing_a_requisition_keeps_stock_untouched() {
    let app = TestApp::new().await;
    let store = app.create_store().await;
    let part = app.create_part(store, 4).await;
    let call = app.create_walk_in_call().await;
    let inquiry = app.create_store_inquiry(call, part, 2).await;

    let res = app
        .as_admin(
            Method::PATCH,
            &format!("/api/v1/store-inquiries/{}", inquiry),
            Some(json!({ "is_issued": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["is_issued"], true);
    assert_eq!(app.part_quantity(part).await, 4);

    let listed = app
        .as_admin(
            Method::GET,
            &format!("/api/v1/calls/{}/store-inquiries", call),
            None,
        )
        .await;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
    assert_eq!(listed.body[0]["id"], json!(inquiry));
}

#[tokio::test]
async fn technicians_find_the_calls_assigned_to_them() {
    let app = TestApp::new().await;
    let technician = Uuid::new_v4();
    let res = app
        .as_admin(
            Method::POST,
            "/api/v1/calls",
            Some(json!({
                "contract_type": "WalkIn",
                "client_name": "Counter customer",
                "client_location": "CBD",
                "walk_in_machine_name": "ECOSYS M2040dn",
                "walk_in_serial_no": "VCF9X05555",
                "reported_by": "Front desk",
                "reported_date": "2026-03-04",
                "fault_reported": "Grinding noise",
                "technicians": [technician]
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["technicians"], json!([technician]));
    let assigned = id_of(&res.body);
    app.create_walk_in_call().await;

    let mine = app
        .as_admin(Method::GET, &format!("/api/v1/calls?technician={}", technician), None)
        .await;
    assert_eq!(mine.status, StatusCode::OK, "{}", mine.body);
    assert_eq!(mine.body.as_array().map(Vec::len), Some(1));
    assert_eq!(mine.body[0]["id"], json!(assigned));

    let res = app
        .as_admin(
            Method::PATCH,
            &format!("/api/v1/calls/{}", assigned),
            Some(json!({
                "status": "In Progress",
                "action_taken": ["Replaced fuser"],
                "parts_used": ["Fuser unit"],
                "meter_reading": 120450
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["action_taken"], json!(["Replaced fuser"]));
    assert_eq!(res.body["meter_reading"], 120450);
    assert_eq!(res.body["technicians"], json!([technician]));

    let in_progress = app
        .as_admin(Method::GET, "/api/v1/calls?status=in_progress", None)
        .await;
    assert_eq!(in_progress.body.as_array().map(Vec::len), Some(1));

    let bogus = app
        .as_admin(Method::GET, "/api/v1/calls?status=closed", None)
        .await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);

    let inverted = app
        .as_admin(
            Method::GET,
            "/api/v1/calls?start_date=2026-03-10&end_date=2026-03-01",
            None,
        )
        .await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);
    assert_eq!(inverted.body["error"], "End date must be after start date");
}

#[tokio::test]
async fn walk_in_call_can_name_a_registered_machine() {
    let app = TestApp::new().await;
    let machine = app
        .as_admin(
            Method::POST,
            "/api/v1/client-machines",
            Some(json!({
                "client_name": "Riverside Clinic",
                "client_location": "Parklands",
                "machine_name": "TASKalfa 3253ci",
                "machine_brand": "Kyocera",
                "serial_no": "LDA4Z00321",
                "machine_type": "Colour copier"
            })),
        )
        .await;
    assert_eq!(machine.status, StatusCode::CREATED, "{}", machine.body);
    let machine = id_of(&machine.body);

    let call = app
        .as_admin(
            Method::POST,
            "/api/v1/calls",
            Some(json!({
                "contract_type": "WalkIn",
                "client_machine_id": machine,
                "reported_by": "Front desk",
                "fault_reported": "Colour banding"
            })),
        )
        .await;
    assert_eq!(call.status, StatusCode::CREATED, "{}", call.body);
    assert_eq!(call.body["walk_in_serial_no"], "LDA4Z00321");
    assert_eq!(call.body["client_name"], "Riverside Clinic");

    let site = app
        .as_admin(
            Method::GET,
            "/api/v1/client-machines?client_name=Riverside%20Clinic&client_location=Parklands",
            None,
        )
        .await;
    assert_eq!(site.body.as_array().map(Vec::len), Some(1));

    let res = app
        .as_admin(Method::DELETE, &format!("/api/v1/client-machines/{}", machine), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["code"], "reference_integrity");
}
