use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    error::AppError,
    models::PaymentMethod,
    services::{order_service, payment_service, payment_service::ConfirmOutcome},
};

// Candidate payload keys the provider has been seen using for each logical
// field, checked in order. Keep this table in sync with the provider docs;
// it replaces guessing at call sites.
const ORDER_REF_KEYS: &[&str] = &["order", "order_id", "orderNumber", "referencia", "reference"];
const TRANSACTION_KEYS: &[&str] = &[
    "tilopay-transaction",
    "tpt",
    "transaction_id",
    "transaccion_id",
    "id",
];
const STATUS_KEYS: &[&str] = &["estado", "status"];

fn as_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_scalar(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(as_scalar)
}

// POST /api/payments
//
// Card path: store the pending order, then create a hosted payment session
// the storefront redirects the customer to. The outcome comes back through
// the confirm endpoint and/or the webhook.
pub async fn post_create_payment(
    State(state): State<AppState>,
    Json(form): Json<order_service::OrderForm>,
) -> Response {
    let order = match order_service::create_order(&state, form, PaymentMethod::Card) {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };

    let token = match state.gateway.authenticate().await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(order_id = %order.order_id, "gateway auth failed: {e}");
            return e.into_response();
        }
    };

    let session = match state.gateway.create_payment_session(&token, &order).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(order_id = %order.order_id, "payment session failed: {e}");
            return e.into_response();
        }
    };

    tracing::info!(order_id = %order.order_id, "payment session created");

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "orderId": order.order_id,
            "total": order.total,
            "paymentUrl": session.payment_url,
            "transactionId": session.transaction_id,
        })),
    )
        .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[serde(default)]
    pub order_id: String,
    // The gateway sends `1` or `"1"` for approved.
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

// POST /api/payments/confirm
//
// Client-initiated confirmation after the gateway redirect. Unknown orders
// are a 404 here; repeats answer success with `alreadyProcessed` instead of
// leaking that the work happened on an earlier call.
pub async fn post_confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Response {
    if req.order_id.trim().is_empty() {
        return AppError::Validation(vec!["orderId".to_string()]).into_response();
    }

    let code = as_scalar(&req.code).unwrap_or_default();

    match payment_service::confirm_payment(&state, &req.order_id, &code, req.transaction_id).await {
        Ok(ConfirmOutcome::Confirmed { order, email_error }) => {
            let mut body = json!({
                "success": true,
                "status": order.status,
                "orderId": order.order_id,
                "message": "Payment confirmed",
            });
            if let Some(err) = email_error {
                body["emailError"] = json!(err);
            }
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(ConfirmOutcome::Declined { order }) => (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "status": order.status,
                "orderId": order.order_id,
                "message": "Payment was not approved",
            })),
        )
            .into_response(),
        Ok(ConfirmOutcome::AlreadyProcessed { order }) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "alreadyProcessed": true,
                "status": order.status,
                "orderId": order.order_id,
            })),
        )
            .into_response(),
        Ok(ConfirmOutcome::Unknown) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Payment status unknown",
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// POST /api/payments/webhook
//
// Server-to-server callback. Always answered 2xx once the payload parses,
// even for unknown orders: anything else makes the provider retry forever.
pub async fn post_webhook(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let Some(order_id) = first_scalar(&payload, ORDER_REF_KEYS) else {
        tracing::error!("webhook payload carried no order reference");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No order ID" })),
        )
            .into_response();
    };

    let transaction_id = first_scalar(&payload, TRANSACTION_KEYS);

    // `code` is authoritative when it is the approved sentinel; anything
    // else defers to the provider's status strings.
    let code = payload.get("code").and_then(as_scalar);
    let outcome = match code.as_deref() {
        Some("1") => "1".to_string(),
        _ => first_scalar(&payload, STATUS_KEYS)
            .or(code)
            .unwrap_or_default(),
    };

    match payment_service::confirm_payment(&state, &order_id, &outcome, transaction_id).await {
        Ok(ConfirmOutcome::Confirmed { order, .. }) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "orderId": order.order_id,
                "message": "Payment confirmed",
            })),
        )
            .into_response(),
        Ok(ConfirmOutcome::Declined { order }) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "orderId": order.order_id,
                "message": "Payment failed - order cancelled",
            })),
        )
            .into_response(),
        Ok(ConfirmOutcome::AlreadyProcessed { order }) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "alreadyProcessed": true,
                "orderId": order.order_id,
                "message": "Order already processed",
            })),
        )
            .into_response(),
        Ok(ConfirmOutcome::Unknown) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Webhook received but status unknown",
            })),
        )
            .into_response(),
        Err(AppError::OrderNotFound(_)) => {
            tracing::error!(order_id = %order_id, "webhook for unknown order");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Order not found but webhook acknowledged",
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, "webhook processing failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Webhook processing failed" })),
            )
                .into_response()
        }
    }
}

// GET /api/payments/webhook (provider liveness probe)
pub async fn get_webhook() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "message": "Payment webhook endpoint is active",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
