use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Settings;
use crate::error::AppError;
use crate::models::Order;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin client for the hosted card-payment provider. The flow is: login for
/// a bearer token, then create a capture session the customer is redirected
/// to; the provider reports the outcome on the redirect and via the webhook.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    api_user: String,
    api_password: String,
    api_key: String,
    app_url: String,
    product_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSession {
    pub payment_url: String,
    pub transaction_id: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct CaptureResponse {
    payment_url: Option<String>,
    url: Option<String>,
    transaction_id: Option<String>,
    id: Option<String>,
}

impl GatewayClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.gateway_base_url.clone(),
            api_user: settings.gateway_user.clone(),
            api_password: settings.gateway_password.clone(),
            api_key: settings.gateway_api_key.clone(),
            app_url: settings.app_url.clone(),
            product_name: settings.product_name.clone(),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.api_user.trim().is_empty()
            && !self.api_password.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }

    pub async fn authenticate(&self) -> Result<String, AppError> {
        if !self.has_credentials() {
            return Err(AppError::NotConfigured("payment gateway"));
        }

        let url = format!("{}/login", self.base_url);
        let res = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "apiuser": self.api_user,
                "password": self.api_password,
            }))
            .send()
            .await
            .map_err(|e| AppError::from_reqwest("gateway login", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::from_status("gateway login", status, &body));
        }

        let login: LoginResponse = res
            .json()
            .await
            .map_err(|e| AppError::Permanent(format!("gateway login: {e}")))?;

        login
            .access_token
            .ok_or_else(|| AppError::Permanent("gateway login: no access token in response".into()))
    }

    pub async fn create_payment_session(
        &self,
        token: &str,
        order: &Order,
    ) -> Result<PaymentSession, AppError> {
        let url = format!("{}/captures", self.base_url);

        let payload = json!({
            "key": self.api_key,
            "amount": order.total,
            "currency": "CRC",
            "description": format!(
                "Order {}: {} (x{})",
                order.order_id, self.product_name, order.quantity
            ),
            "order_id": order.order_id,
            "redirect_success": format!("{}/success.html?orderId={}", self.app_url, order.order_id),
            "redirect_error": format!("{}/error.html?orderId={}", self.app_url, order.order_id),
            "notification_url": format!("{}/api/payments/webhook", self.app_url),
            "email": order.customer.email,
            "platform": "5",
        });

        let res = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::from_reqwest("gateway capture", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::from_status("gateway capture", status, &body));
        }

        let capture: CaptureResponse = res
            .json()
            .await
            .map_err(|e| AppError::Permanent(format!("gateway capture: {e}")))?;

        let payment_url = capture
            .payment_url
            .or(capture.url)
            .ok_or_else(|| AppError::Permanent("gateway capture: no payment url in response".into()))?;

        Ok(PaymentSession {
            payment_url,
            transaction_id: capture.transaction_id.or(capture.id),
        })
    }
}
