use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    models::PaymentMethod,
    services::{crm_service, email_service, order_service},
};

// POST /api/orders/manual
//
// Manual-transfer path: the order is stored pending and the customer is
// emailed the transfer instructions right away; confirmation happens later,
// once someone matches the memo reference against the bank statement.
pub async fn post_manual_order(
    State(state): State<AppState>,
    Json(form): Json<order_service::OrderForm>,
) -> Response {
    let order = match order_service::create_order(&state, form, PaymentMethod::ManualTransfer) {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };

    if let Err(e) =
        email_service::notify_order(state.mailer.as_ref(), &state.settings, &order).await
    {
        tracing::error!(order_id = %order.order_id, "order emails failed: {e}");
        return e.into_response();
    }

    crm_service::spawn_sync(&state, order.clone());

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "orderId": order.order_id,
            "total": order.total,
            "message": format!(
                "Order received. Check your email for payment instructions and quote {} in the transfer memo.",
                order.order_id
            ),
        })),
    )
        .into_response()
}
