use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use rustcheckout::error::AppError;
use rustcheckout::models::{Customer, Order, OrderStatus, PaymentMethod};
use rustcheckout::services::crm_service::{self, CrmApi, CrmOrder, CrmReceipt, SyncResult};

struct ScriptedCrm {
    script: Mutex<VecDeque<Result<CrmReceipt, AppError>>>,
    calls: AtomicU32,
}

impl ScriptedCrm {
    fn new(script: Vec<Result<CrmReceipt, AppError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrmApi for ScriptedCrm {
    async fn submit_order(&self, _payload: &CrmOrder) -> Result<CrmReceipt, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted CRM called more times than scripted")
    }
}

fn receipt(id: &str) -> CrmReceipt {
    CrmReceipt {
        crm_order_id: Some(id.to_string()),
        id: None,
    }
}

fn server_error() -> AppError {
    AppError::Transient("CRM sync: 500 Internal Server Error".to_string())
}

fn completed_order() -> Order {
    Order {
        order_id: "ORD-1700000000000-AB12CD".to_string(),
        status: OrderStatus::Completed,
        processed: true,
        quantity: 2,
        total: 16_900,
        payment_method: PaymentMethod::Card,
        payment_reference: Some("tx-9".to_string()),
        customer: Customer {
            name: "Ana".to_string(),
            phone: "8888-0000".to_string(),
            email: "ana@example.com".to_string(),
            province: "San Jose".to_string(),
            canton: "Central".to_string(),
            district: "Carmen".to_string(),
            address: "Main street 1".to_string(),
            comments: Some("leave at the door".to_string()),
        },
        created_at: Utc::now(),
        paid_at: Some(Utc::now()),
    }
}

const PRODUCT: &str = "Anti-Snoring Mouthguard";

#[tokio::test]
async fn transient_failures_are_retried_with_linear_backoff() {
    let crm = ScriptedCrm::new(vec![
        Err(server_error()),
        Err(server_error()),
        Ok(receipt("crm-1")),
    ]);
    let order = completed_order();
    let base = Duration::from_millis(10);

    let started = Instant::now();
    let result = crm_service::sync_order(&crm, &order, PRODUCT, base).await;
    let elapsed = started.elapsed();

    assert_eq!(result, SyncResult::Synced { attempts: 3 });
    assert_eq!(crm.calls(), 3);
    // Two backoff waits: 1x base and 2x base.
    assert!(elapsed >= base * 3, "expected >= 30ms of backoff, got {elapsed:?}");
}

#[tokio::test]
async fn transient_failures_give_up_after_three_attempts() {
    let crm = ScriptedCrm::new(vec![
        Err(server_error()),
        Err(server_error()),
        Err(server_error()),
    ]);
    let order = completed_order();

    let result = crm_service::sync_order(&crm, &order, PRODUCT, Duration::from_millis(1)).await;

    assert_eq!(result, SyncResult::Failed { attempts: 3 });
    assert_eq!(crm.calls(), 3);
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let crm = ScriptedCrm::new(vec![Err(AppError::Permanent(
        "CRM sync: 400 Bad Request".to_string(),
    ))]);
    let order = completed_order();

    let result = crm_service::sync_order(&crm, &order, PRODUCT, Duration::from_millis(1)).await;

    assert_eq!(result, SyncResult::Failed { attempts: 1 });
    assert_eq!(crm.calls(), 1);
}

#[tokio::test]
async fn missing_configuration_skips_without_retrying() {
    let crm = ScriptedCrm::new(vec![Err(AppError::NotConfigured("CRM"))]);
    let order = completed_order();

    let result = crm_service::sync_order(&crm, &order, PRODUCT, Duration::from_millis(1)).await;

    assert_eq!(result, SyncResult::Skipped);
    assert_eq!(crm.calls(), 1);
}

#[test]
fn payload_mirrors_the_order() {
    let order = completed_order();
    let payload = CrmOrder::from_order(&order, PRODUCT);

    assert_eq!(payload.order_id, order.order_id);
    assert_eq!(payload.customer.name, "Ana");
    assert_eq!(payload.product.quantity, 2);
    assert_eq!(payload.product.unit_price, "\u{20a1}9.900");
    assert_eq!(payload.total, "\u{20a1}16.900");
    assert_eq!(payload.payment.method, "card");
    assert_eq!(payload.payment.transaction_id, "tx-9");
    // Fulfilment status stays pending even for paid orders.
    assert_eq!(payload.payment.status, "PENDING");
    assert!(payload.metadata.comments.contains("PAID"));
    assert!(payload.metadata.comments.contains("leave at the door"));

    let wire = serde_json::to_value(&payload).unwrap();
    assert!(wire["orderId"].is_string());
    assert!(wire["shipping"]["address"]["fullAddress"].is_string());
}

#[test]
fn manual_transfer_payload_reports_awaiting_confirmation() {
    let mut order = completed_order();
    order.payment_method = PaymentMethod::ManualTransfer;
    order.status = OrderStatus::Pending;
    order.processed = false;
    order.payment_reference = None;
    order.paid_at = None;

    let payload = CrmOrder::from_order(&order, PRODUCT);
    assert_eq!(payload.payment.method, "manual-transfer");
    assert_eq!(payload.payment.transaction_id, "PENDING");
    assert!(payload.metadata.comments.contains("awaiting confirmation"));
}
