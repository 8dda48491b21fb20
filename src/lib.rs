//! Library entrypoint for RustCheckout.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services).

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub mod services;

pub mod controllers;
pub mod routes;

use services::crm_service::{CrmApi, CrmClient};
use services::email_service::{EmailSender, ResendClient};
use services::gateway::GatewayClient;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub orders: store::OrderStore,
    pub mailer: Arc<dyn EmailSender>,
    pub gateway: GatewayClient,
    pub crm: Arc<dyn CrmApi>,
}

impl AppState {
    /// Production wiring: real provider clients built from the settings.
    /// Tests build the struct directly with doubles behind the trait seams.
    pub fn new(settings: config::Settings) -> Self {
        let gateway = GatewayClient::new(&settings);
        let mailer: Arc<dyn EmailSender> =
            Arc::new(ResendClient::new(settings.resend_api_key.clone()));
        let crm: Arc<dyn CrmApi> = Arc::new(CrmClient::new(
            settings.crm_api_url.clone(),
            settings.crm_api_key.clone(),
        ));

        Self {
            settings,
            orders: store::OrderStore::new(),
            mailer,
            gateway,
            crm,
        }
    }
}
