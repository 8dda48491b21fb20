use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::Settings;
use crate::error::AppError;
use crate::models::{Order, PaymentMethod};
use crate::services::pricing;

const RESEND_URL: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Seam for the email provider so tests can inject a counting double.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, email: OutgoingEmail) -> Result<String, AppError>;
}

#[derive(Clone)]
pub struct ResendClient {
    http: Client,
    api_key: String,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: OutgoingEmail) -> Result<String, AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::NotConfigured("email provider"));
        }

        let res = self
            .http
            .post(RESEND_URL)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": email.from,
                "to": email.to,
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await
            .map_err(|e| AppError::from_reqwest("email send", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::from_status("email send", status, &body));
        }

        let sent: SendResponse = res
            .json()
            .await
            .map_err(|e| AppError::Permanent(format!("email send: {e}")))?;

        Ok(sent.id)
    }
}

/// Sends the order emails: the customer copy is best-effort (failure is
/// logged and swallowed), the admin notification is required and its
/// failure propagates. Callers must not roll back order state on error.
pub async fn notify_order(
    mailer: &dyn EmailSender,
    settings: &Settings,
    order: &Order,
) -> Result<(), AppError> {
    if settings.order_notification_email.trim().is_empty() {
        return Err(AppError::NotConfigured("order notifications"));
    }

    if !order.customer.email.trim().is_empty() {
        let email = customer_email(settings, order);
        if let Err(e) = mailer.send(email).await {
            tracing::warn!(order_id = %order.order_id, "customer email failed: {e}");
        }
    }

    let id = mailer.send(admin_email(settings, order)).await?;
    tracing::info!(order_id = %order.order_id, email_id = %id, "admin notification sent");
    Ok(())
}

fn customer_email(settings: &Settings, order: &Order) -> OutgoingEmail {
    let total = pricing::format_crc(order.total);

    let payment_block = match order.payment_method {
        PaymentMethod::ManualTransfer => format!(
            "<h3>Payment instructions</h3>\
             <ol>\
             <li>Open your bank's mobile transfer app</li>\
             <li>Transfer <strong>{total}</strong></li>\
             <li>Write <strong>{order_id}</strong> in the memo field</li>\
             </ol>\
             <p>We can only match your payment through that reference.</p>",
            total = total,
            order_id = order.order_id,
        ),
        PaymentMethod::Card => "<p>Your card payment was processed successfully.</p>".to_string(),
    };

    let html = format!(
        "<h2>Order confirmation</h2>\
         <p>Hi <strong>{name}</strong>, thanks for your order.</p>\
         <p>Order <strong>{order_id}</strong>: {quantity} x {product}, total <strong>{total}</strong>, free shipping.</p>\
         {payment_block}\
         <p>Shipping to: {address}, {district}, {canton}, {province}.</p>\
         <p>We will contact you to coordinate the delivery.</p>",
        name = order.customer.name,
        order_id = order.order_id,
        quantity = order.quantity,
        product = settings.product_name,
        total = total,
        payment_block = payment_block,
        address = order.customer.address,
        district = order.customer.district,
        canton = order.customer.canton,
        province = order.customer.province,
    );

    OutgoingEmail {
        from: settings.email_from.clone(),
        to: order.customer.email.clone(),
        subject: format!("Order confirmation {}", order.order_id),
        html,
    }
}

fn admin_email(settings: &Settings, order: &Order) -> OutgoingEmail {
    let method = match order.payment_method {
        PaymentMethod::ManualTransfer => "manual transfer",
        PaymentMethod::Card => "card",
    };

    let reference = order.payment_reference.as_deref().unwrap_or("pending");
    let paid = match order.paid_at {
        Some(at) => format!("PAID at {}", at.to_rfc3339()),
        None => "PENDING".to_string(),
    };

    let comments = order
        .customer
        .comments
        .as_deref()
        .map(|c| format!("<p><strong>Customer comments:</strong> {c}</p>"))
        .unwrap_or_default();

    let html = format!(
        "<h2>New order {order_id}</h2>\
         <p><strong>Customer:</strong> {name}, {phone}, {email}</p>\
         <p><strong>Product:</strong> {quantity} x {product} (unit {unit})</p>\
         <p><strong>Total:</strong> {total}</p>\
         <p><strong>Shipping:</strong> {address}, {district}, {canton}, {province}</p>\
         <p><strong>Payment:</strong> {method}, reference {reference}, {paid}</p>\
         {comments}",
        order_id = order.order_id,
        name = order.customer.name,
        phone = order.customer.phone,
        email = order.customer.email,
        quantity = order.quantity,
        product = settings.product_name,
        unit = pricing::format_crc(pricing::UNIT_PRICE),
        total = pricing::format_crc(order.total),
        address = order.customer.address,
        district = order.customer.district,
        canton = order.customer.canton,
        province = order.customer.province,
        method = method,
        reference = reference,
        paid = paid,
        comments = comments,
    );

    OutgoingEmail {
        from: settings.email_from.clone(),
        to: settings.order_notification_email.clone(),
        subject: format!("New order: {} - {}", order.order_id, order.customer.name),
        html,
    }
}
