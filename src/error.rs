use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    // Network failures, timeouts, 5xx. Retryable.
    #[error("transient provider error: {0}")]
    Transient(String),

    // 4xx or malformed responses. Retrying won't change anything.
    #[error("provider error: {0}")]
    Permanent(String),
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }

    pub fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::Transient(format!("{context}: {err}"))
        } else {
            AppError::Permanent(format!("{context}: {err}"))
        }
    }

    pub fn from_status(context: &str, status: reqwest::StatusCode, body: &str) -> Self {
        if status.is_server_error() {
            AppError::Transient(format!("{context}: {status} {body}"))
        } else {
            AppError::Permanent(format!("{context}: {status} {body}"))
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Transient(_) | AppError::Permanent(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Validation(missing) => json!({
                "error": "Missing required fields",
                "missing": missing,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
