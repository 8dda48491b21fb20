use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    http::{Request, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use rustcheckout::{
    AppState,
    config::Settings,
    controllers::orders_controller,
    error::AppError,
    models::OrderStatus,
    services::crm_service::{CrmApi, CrmOrder, CrmReceipt},
    services::email_service::{EmailSender, OutgoingEmail},
    services::gateway::GatewayClient,
    store::OrderStore,
};

struct CountingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl CountingMailer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent_to(&self, to: &str) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EmailSender for CountingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<String, AppError> {
        self.sent.lock().unwrap().push(email);
        Ok("email_1".to_string())
    }
}

struct NullCrm;

#[async_trait]
impl CrmApi for NullCrm {
    async fn submit_order(&self, _payload: &CrmOrder) -> Result<CrmReceipt, AppError> {
        Err(AppError::NotConfigured("CRM"))
    }
}

fn test_settings() -> Settings {
    Settings {
        host: "127.0.0.1".to_string(),
        port: 0,
        app_url: "http://localhost:3000".to_string(),
        product_name: "Anti-Snoring Mouthguard".to_string(),
        resend_api_key: "re_test".to_string(),
        email_from: "orders@example.com".to_string(),
        order_notification_email: "admin@example.com".to_string(),
        gateway_base_url: "http://localhost:9".to_string(),
        gateway_user: String::new(),
        gateway_password: String::new(),
        gateway_api_key: String::new(),
        crm_api_url: String::new(),
        crm_api_key: String::new(),
        crm_retry_base_ms: 1,
    }
}

fn test_state(mailer: Arc<CountingMailer>) -> AppState {
    let settings = test_settings();
    AppState {
        gateway: GatewayClient::new(&settings),
        settings,
        orders: OrderStore::new(),
        mailer,
        crm: Arc::new(NullCrm),
    }
}

fn manual_order_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/orders/manual",
            post(orders_controller::post_manual_order),
        )
        .with_state(state)
}

async fn response_body_json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn valid_order_body(quantity: Value) -> Value {
    json!({
        "name": "Ana",
        "phone": "8888-0000",
        "email": "ana@example.com",
        "province": "San Jose",
        "canton": "Central",
        "district": "Carmen",
        "quantity": quantity,
        "address": "Main street 1",
    })
}

#[tokio::test]
async fn manual_order_with_missing_fields_lists_them_all() {
    let state = test_state(CountingMailer::new());
    let app = manual_order_app(state);

    let res = app
        .oneshot(json_request(
            "/api/orders/manual",
            json!({ "name": "Ana", "email": "ana@example.com", "quantity": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_json(res).await;
    let missing: Vec<&str> = body["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    for field in ["phone", "province", "canton", "district", "address"] {
        assert!(missing.contains(&field), "expected {field} in {missing:?}");
    }
}

#[tokio::test]
async fn manual_order_with_malformed_email_is_rejected() {
    let state = test_state(CountingMailer::new());
    let app = manual_order_app(state);

    let mut body = valid_order_body(json!(1));
    body["email"] = json!("not-an-email");

    let res = app
        .oneshot(json_request("/api/orders/manual", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_json(res).await;
    assert!(body["missing"].as_array().unwrap().contains(&json!("email")));
}

#[tokio::test]
async fn manual_order_creates_pending_order_and_sends_memo_instructions() {
    let mailer = CountingMailer::new();
    let state = test_state(mailer.clone());
    let app = manual_order_app(state.clone());

    let res = app
        .oneshot(json_request(
            "/api/orders/manual",
            valid_order_body(json!(2)),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_body_json(res).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["total"], json!(16_900));

    let order_id = body["orderId"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("ORD-"));
    assert!(body["message"].as_str().unwrap().contains(&order_id));

    // Stored pending; the total comes from the tier table, not quantity math.
    let order = state.orders.get(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.processed);
    assert_eq!(order.quantity, 2);
    assert_eq!(order.total, 16_900);

    // One admin notification, one customer email carrying the memo reference.
    let admin = mailer.sent_to("admin@example.com");
    assert_eq!(admin.len(), 1);
    let customer = mailer.sent_to("ana@example.com");
    assert_eq!(customer.len(), 1);
    assert!(customer[0].html.contains(&order_id));
    assert!(customer[0].html.contains("memo"));
}

#[tokio::test]
async fn manual_order_coerces_quantity_strings() {
    let mailer = CountingMailer::new();
    let state = test_state(mailer.clone());
    let app = manual_order_app(state.clone());

    let res = app
        .oneshot(json_request(
            "/api/orders/manual",
            valid_order_body(json!("3")),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_body_json(res).await;
    assert_eq!(body["total"], json!(25_900));

    // Garbage quantity falls back to a single unit.
    let res = manual_order_app(state)
        .oneshot(json_request(
            "/api/orders/manual",
            valid_order_body(json!("lots")),
        ))
        .await
        .unwrap();
    let body = response_body_json(res).await;
    assert_eq!(body["total"], json!(9_900));
}
