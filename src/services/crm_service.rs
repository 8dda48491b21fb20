use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppError;
use crate::models::{Order, OrderStatus, PaymentMethod};
use crate::services::pricing;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmOrder {
    pub order_id: String,
    pub customer: CrmCustomer,
    pub product: CrmProduct,
    pub shipping: CrmShipping,
    pub total: String,
    pub payment: CrmPayment,
    pub source: String,
    pub metadata: CrmMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrmCustomer {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmProduct {
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrmShipping {
    pub cost: String,
    pub address: CrmAddress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmAddress {
    pub province: String,
    pub canton: String,
    pub district: String,
    pub full_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmPayment {
    pub method: String,
    pub transaction_id: String,
    // Fulfilment status, always pending on sync: the CRM tracks the order,
    // not the payment.
    pub status: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmMetadata {
    pub comments: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrmReceipt {
    #[serde(rename = "crmOrderId")]
    pub crm_order_id: Option<String>,
    pub id: Option<String>,
}

impl CrmReceipt {
    pub fn order_id(&self) -> Option<&str> {
        self.crm_order_id.as_deref().or(self.id.as_deref())
    }
}

impl CrmOrder {
    pub fn from_order(order: &Order, product_name: &str) -> Self {
        let transaction_id = order
            .payment_reference
            .clone()
            .unwrap_or_else(|| "PENDING".to_string());

        let payment_line = match (order.payment_method, order.status) {
            (PaymentMethod::ManualTransfer, _) => {
                "Payment: manual transfer - awaiting confirmation".to_string()
            }
            (PaymentMethod::Card, OrderStatus::Completed) => {
                format!("Payment: card - PAID - transaction {transaction_id}")
            }
            (PaymentMethod::Card, _) => "Payment: card - pending".to_string(),
        };

        let comments = match order.customer.comments.as_deref() {
            Some(c) => format!("{payment_line}\n\nCustomer comments: {c}"),
            None => payment_line,
        };

        let method = match order.payment_method {
            PaymentMethod::ManualTransfer => "manual-transfer",
            PaymentMethod::Card => "card",
        };

        CrmOrder {
            order_id: order.order_id.clone(),
            customer: CrmCustomer {
                name: order.customer.name.clone(),
                phone: order.customer.phone.clone(),
                email: order.customer.email.clone(),
            },
            product: CrmProduct {
                name: product_name.to_string(),
                quantity: order.quantity,
                unit_price: pricing::format_crc(pricing::UNIT_PRICE),
            },
            shipping: CrmShipping {
                cost: "FREE".to_string(),
                address: CrmAddress {
                    province: order.customer.province.clone(),
                    canton: order.customer.canton.clone(),
                    district: order.customer.district.clone(),
                    full_address: order.customer.address.clone(),
                },
            },
            total: pricing::format_crc(order.total),
            payment: CrmPayment {
                method: method.to_string(),
                transaction_id,
                status: "PENDING".to_string(),
                date: chrono::Utc::now().to_rfc3339(),
            },
            source: "storefront".to_string(),
            metadata: CrmMetadata {
                comments,
                created_at: order.created_at.to_rfc3339(),
            },
        }
    }
}

/// Seam for the CRM so tests can script transient/permanent failures.
#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn submit_order(&self, payload: &CrmOrder) -> Result<CrmReceipt, AppError>;
}

#[derive(Clone)]
pub struct CrmClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl CrmClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl CrmApi for CrmClient {
    async fn submit_order(&self, payload: &CrmOrder) -> Result<CrmReceipt, AppError> {
        if self.api_url.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(AppError::NotConfigured("CRM"));
        }

        let res = self
            .http
            .post(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::from_reqwest("CRM sync", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::from_status("CRM sync", status, &body));
        }

        res.json::<CrmReceipt>()
            .await
            .map_err(|e| AppError::Permanent(format!("CRM sync: {e}")))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SyncResult {
    Synced { attempts: u32 },
    Skipped,
    Failed { attempts: u32 },
}

/// Pushes one order to the CRM with bounded retry and linear backoff
/// (base x 1, base x 2 between the three attempts). Only transient failures
/// are retried; "not configured" and 4xx bail immediately. Never errors to
/// the caller and never touches order state.
pub async fn sync_order(crm: &dyn CrmApi, order: &Order, product_name: &str, base_delay: Duration) -> SyncResult {
    let payload = CrmOrder::from_order(order, product_name);

    for attempt in 1..=MAX_ATTEMPTS {
        match crm.submit_order(&payload).await {
            Ok(receipt) => {
                tracing::info!(
                    order_id = %order.order_id,
                    crm_order_id = receipt.order_id().unwrap_or("unknown"),
                    attempt,
                    "order synced to CRM"
                );
                return SyncResult::Synced { attempts: attempt };
            }
            Err(AppError::NotConfigured(what)) => {
                tracing::warn!("{what} is not configured, skipping sync");
                return SyncResult::Skipped;
            }
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = base_delay * attempt;
                tracing::warn!(
                    order_id = %order.order_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "CRM sync failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(order_id = %order.order_id, attempt, "CRM sync failed: {e}");
                return SyncResult::Failed { attempts: attempt };
            }
        }
    }

    unreachable!("retry loop always returns")
}

/// Fire-and-forget sync; the request path never waits on the CRM.
pub fn spawn_sync(state: &AppState, order: Order) {
    let crm = state.crm.clone();
    let product_name = state.settings.product_name.clone();
    let base_delay = Duration::from_millis(state.settings.crm_retry_base_ms);

    tokio::spawn(async move {
        sync_order(crm.as_ref(), &order, &product_name, base_delay).await;
    });
}
