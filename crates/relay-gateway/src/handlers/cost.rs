//! `GET /api/cost/request/{request_id}` (§6).

use axum::extract::{Path, State};
use axum::response::Json;

use crate::error::ApiError;
use crate::log::LogEntry;
use crate::state::AppState;

pub async fn request_cost(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<LogEntry>, ApiError> {
    state
        .log
        .get(&request_id)
        .map(Json)
        .ok_or_else(|| ApiError::new(404, "not_found", format!("no settled request {request_id}")))
}
