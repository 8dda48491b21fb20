use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::models::{Customer, Order, OrderStatus, PaymentMethod};
use crate::services::pricing;
use crate::store::OrderStore;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub canton: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub address: String,

    // The storefront sends this as a number or a string; anything
    // non-numeric falls back to 1.
    #[serde(default)]
    pub quantity: serde_json::Value,

    #[serde(default)]
    pub comments: Option<String>,
}

fn validate(form: &OrderForm) -> Result<(), AppError> {
    let required = [
        ("name", &form.name),
        ("phone", &form.phone),
        ("email", &form.email),
        ("province", &form.province),
        ("canton", &form.canton),
        ("district", &form.district),
        ("address", &form.address),
    ];

    let mut missing: Vec<String> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field.to_string())
        .collect();

    if !form.email.trim().is_empty() {
        let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
        if !re.is_match(form.email.trim()) {
            missing.push("email".to_string());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(missing))
    }
}

fn parse_quantity(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(1),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(1),
        _ => 1,
    }
}

// ORD-<epoch-millis>-<6 uppercase alphanumerics>: short enough to copy into
// a transfer memo, random enough to not collide at this volume. The store
// check covers the improbable collision anyway.
fn generate_order_id(store: &OrderStore) -> String {
    loop {
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(6)
            .map(|b| (b as char).to_ascii_uppercase())
            .collect();

        let id = format!("ORD-{}-{}", Utc::now().timestamp_millis(), suffix);
        if !store.contains(&id) {
            return id;
        }
    }
}

/// Validates the submitted fields, prices the order and inserts it into the
/// store as pending/unprocessed. The total only ever comes from the pricing
/// table, never from the client.
pub fn create_order(
    state: &AppState,
    form: OrderForm,
    method: PaymentMethod,
) -> Result<Order, AppError> {
    validate(&form)?;

    let requested = parse_quantity(&form.quantity);
    let quantity = pricing::clamp_quantity(requested);
    let total = pricing::price(requested);

    let order = Order {
        order_id: generate_order_id(&state.orders),
        status: OrderStatus::Pending,
        processed: false,
        quantity,
        total,
        payment_method: method,
        payment_reference: None,
        customer: Customer {
            name: form.name.trim().to_string(),
            phone: form.phone.trim().to_string(),
            email: form.email.trim().to_string(),
            province: form.province.trim().to_string(),
            canton: form.canton.trim().to_string(),
            district: form.district.trim().to_string(),
            address: form.address.trim().to_string(),
            comments: form.comments.filter(|c| !c.trim().is_empty()),
        },
        created_at: Utc::now(),
        paid_at: None,
    };

    state.orders.insert(order.clone());
    tracing::info!(
        order_id = %order.order_id,
        method = ?method,
        quantity,
        total,
        "order created"
    );

    Ok(order)
}
