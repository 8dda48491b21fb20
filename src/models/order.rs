use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    ManualTransfer,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
}

// Immutable after order creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub province: String,
    pub canton: String,
    pub district: String,
    pub address: String,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // Generated once at creation. Doubles as the idempotency key and as the
    // memo reference the customer quotes in a manual transfer.
    pub order_id: String,

    pub status: OrderStatus,

    // Set once a terminal decision has been recorded. Only the store's
    // check-and-set may flip it.
    pub processed: bool,

    pub quantity: u32,
    pub total: i64,

    pub payment_method: PaymentMethod,

    // Gateway transaction id, set on confirmation only.
    pub payment_reference: Option<String>,

    pub customer: Customer,

    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}
