#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use bititec_api::{
    auth::{Claims, Role},
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "integration_test_secret_for_bititec_api_tokens_must_be_64_chars_long!";

/// Application router on a throwaway SQLite file
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

/// Status plus parsed JSON body (Null when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("bititec_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = bititec_api::build_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Bearer token for a fresh user holding `role`
    pub fn token_for(&self, role: Role) -> String {
        self.token_for_user(Uuid::new_v4(), role)
    }

    pub fn token_for_user(&self, user_id: Uuid, role: Role) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            name: Some(format!("{} user", role)),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + 3600,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("encode access token")
    }

    /// Token of a director, who may edit anything
    pub fn admin_token(&self) -> String {
        self.token_for(Role::Director)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is JSON")
        };
        TestResponse { status, body }
    }

    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let token = self.admin_token();
        self.request(method, uri, body, Some(&token)).await
    }

    // Seeding helpers go through the API so they exercise the same paths.

    pub async fn create_store(&self) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/stores",
                Some(json!({
                    "store_name": format!("Store {}", &Uuid::new_v4().to_string()[..8]),
                    "location": "Industrial Area"
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn create_client(&self) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/clients",
                Some(json!({
                    "client_name": format!("Client {}", &Uuid::new_v4().to_string()[..8]),
                    "client_location": "Westlands"
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn create_part(&self, store_id: Uuid, quantity: i32) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/parts",
                Some(json!({
                    "store_id": store_id,
                    "part_name": "Fuser unit",
                    "part_type": "Fuser",
                    "ref_no": format!("FU-{}", Uuid::new_v4()),
                    "unit_value": "4500.00",
                    "quantity": quantity
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn create_machine(&self, store_id: Uuid) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/machines",
                Some(json!({
                    "store_id": store_id,
                    "machine_name": "TASKalfa 3253ci",
                    "machine_type": "Copier",
                    "serial_no": format!("SN-{}", Uuid::new_v4()),
                    "machine_condition": "New",
                    "unit_value": "350000.00"
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn create_lease(&self, client_id: Uuid, machine_id: Uuid, store_id: Uuid) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/leases",
                Some(json!({
                    "client_id": client_id,
                    "item_id": machine_id,
                    "store_id": store_id,
                    "from_date": "2026-01-01",
                    "to_date": "2026-12-31",
                    "contract_type": "Lease"
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn create_walk_in_call(&self) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/calls",
                Some(json!({
                    "contract_type": "WalkIn",
                    "client_name": "Counter customer",
                    "client_location": "CBD",
                    "walk_in_machine_name": "ECOSYS M2040dn",
                    "walk_in_serial_no": "VCF9X01234",
                    "reported_by": "Front desk",
                    "fault_reported": "Paper jam on every print"
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn create_store_inquiry(&self, call_id: Uuid, part_id: Uuid, quantity: i32) -> Uuid {
        let res = self
            .as_admin(
                Method::POST,
                "/api/v1/store-inquiries",
                Some(json!({
                    "service_call_id": call_id,
                    "part_name": "Fuser unit",
                    "part_id": part_id,
                    "quantity": quantity
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        id_of(&res.body)
    }

    pub async fn part_quantity(&self, part_id: Uuid) -> i64 {
        let res = self
            .as_admin(Method::GET, &format!("/api/v1/parts/{}", part_id), None)
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["quantity"].as_i64().expect("quantity")
    }

    pub async fn part_view(&self, part_id: Uuid) -> Value {
        let res = self
            .as_admin(Method::GET, &format!("/api/v1/parts/{}", part_id), None)
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["stock"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("no id in {}", body))
}
