use axum::{Router, routing::post};

use crate::{AppState, controllers::orders_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route(
        "/api/orders/manual",
        post(orders_controller::post_manual_order),
    )
}
