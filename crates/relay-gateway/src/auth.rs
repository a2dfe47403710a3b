//! `Authorization: Bearer <token>` extraction middleware (§6).
//!
//! Resolves the bearer token against the ledger's token table and injects
//! the resolved `(token_id, user_id, group)` as a request extension, so
//! route handlers never touch the raw header.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthenticatedToken {
    pub token_id: u64,
    pub user_id: u64,
    pub group: String,
}

pub async fn require_bearer_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::new(401, "authentication_error", "missing Authorization header"))?;

    let raw_token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::new(401, "authentication_error", "expected a Bearer token"))?;

    let token_id: u64 = raw_token
        .parse()
        .map_err(|_| ApiError::new(401, "authentication_error", "malformed bearer token"))?;

    let remaining = state
        .ledger
        .token_remaining(token_id)
        .map_err(|_| ApiError::new(401, "authentication_error", "unknown token"))?;

    if remaining <= 0 {
        return Err(ApiError::new(402, "insufficient_quota", "token has no remaining quota"));
    }

    let user_id = state
        .ledger
        .token_owner(token_id)
        .map_err(|_| ApiError::new(401, "authentication_error", "unknown token"))?;
    let group = state
        .ledger
        .user_group(user_id)
        .map_err(|_| ApiError::new(401, "authentication_error", "unknown user"))?;

    request
        .extensions_mut()
        .insert(AuthenticatedToken { token_id, user_id, group });

    Ok(next.run(request).await)
}
