//! Maps internal error types onto the gateway's `{error:{type,message,code}}`
//! envelope (§7, §6).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Wraps any failure a handler can produce so a single `IntoResponse` impl
/// covers the whole route surface.
pub struct ApiError {
    status: StatusCode,
    error_type: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: u16, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            error_type,
            message: message.into(),
        }
    }
}

impl From<relay_core::RelayError> for ApiError {
    fn from(err: relay_core::RelayError) -> Self {
        let error_type = if err.is_client_cancel() {
            "client_cancel"
        } else if err.is_rate_limited() {
            "rate_limited"
        } else if err.is_payload_too_large() {
            "payload_too_large"
        } else if err.is_auth_like() {
            "auth_quota_permission"
        } else if err.is_transient_server() {
            "transient_server"
        } else {
            "invalid_request"
        };
        Self::new(err.status(), error_type, err.to_string())
    }
}

impl From<relay_billing::BillingError> for ApiError {
    fn from(err: relay_billing::BillingError) -> Self {
        let status = match err {
            relay_billing::BillingError::UnknownTransaction(_) => 404,
            relay_billing::BillingError::AlreadyTerminal { .. } => 409,
            relay_billing::BillingError::Overflow => 500,
            relay_billing::BillingError::Ledger(_) => 402,
        };
        Self::new(status, "billing_error", err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "type": self.error_type,
                "message": self.message,
                "code": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}
