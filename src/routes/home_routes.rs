use axum::{Router, routing::get};

use crate::{AppState, controllers::home_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/health", get(home_controller::health))
}
