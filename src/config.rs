use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    // Public base URL, used for gateway redirects and the webhook callback.
    pub app_url: String,

    pub product_name: String,

    pub resend_api_key: String,
    pub email_from: String,
    pub order_notification_email: String,

    pub gateway_base_url: String,
    pub gateway_user: String,
    pub gateway_password: String,
    pub gateway_api_key: String,

    pub crm_api_url: String,
    pub crm_api_key: String,
    pub crm_retry_base_ms: u64,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let app_url = env::var("APP_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));

    let product_name =
        env::var("PRODUCT_NAME").unwrap_or_else(|_| "Anti-Snoring Mouthguard".to_string());

    // Provider credentials default to empty, which disables the feature
    // instead of failing startup.
    let resend_api_key = env::var("RESEND_API_KEY").unwrap_or_default();
    let email_from = env::var("EMAIL_FROM").unwrap_or_else(|_| "orders@example.com".to_string());
    let order_notification_email = env::var("ORDER_NOTIFICATION_EMAIL").unwrap_or_default();

    let gateway_base_url = env::var("GATEWAY_BASE_URL")
        .unwrap_or_else(|_| "https://app.tilopay.com/api/v1".to_string());
    let gateway_user = env::var("GATEWAY_USER").unwrap_or_default();
    let gateway_password = env::var("GATEWAY_PASSWORD").unwrap_or_default();
    let gateway_api_key = env::var("GATEWAY_API_KEY").unwrap_or_default();

    let crm_api_url = env::var("CRM_API_URL").unwrap_or_default();
    let crm_api_key = env::var("CRM_API_KEY").unwrap_or_default();

    let crm_retry_base_ms = env::var("CRM_RETRY_BASE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1000);

    Settings {
        host,
        port,
        app_url,
        product_name,
        resend_api_key,
        email_from,
        order_notification_email,
        gateway_base_url,
        gateway_user,
        gateway_password,
        gateway_api_key,
        crm_api_url,
        crm_api_key,
        crm_retry_base_ms,
    }
}
