use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, controllers::payments_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/payments", post(payments_controller::post_create_payment))
        .route(
            "/api/payments/confirm",
            post(payments_controller::post_confirm_payment),
        )
        .route(
            "/api/payments/webhook",
            get(payments_controller::get_webhook).post(payments_controller::post_webhook),
        )
}
