//! `GET /v1/models`: lists the models the caller's group can currently
//! reach. Concurrent callers in the same group share one read through the
//! ability index via `relay-coalesce` rather than each re-walking it (§4.9,
//! §5 — "anonymous model listing" is the crate's own motivating example).

use axum::extract::{Extension, State};
use axum::response::Json;
use serde_json::json;

use crate::auth::AuthenticatedToken;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_models(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let group = auth.group.clone();
    let index = state.index.clone();
    let models = state
        .models_coalescer
        .run(&auth.group, || async move { Ok::<_, String>(index.models_for_group(&group)) })
        .await
        .map_err(|err| ApiError::new(500, "internal_error", err.to_string()))?;

    Ok(Json(json!({ "object": "list", "data": models })))
}
