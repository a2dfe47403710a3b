//! Kubernetes-style health endpoints (§6), following the same readiness
//! vs. liveness split the teacher's own example server exposes.

use axum::response::Json;
use serde_json::json;

pub async fn health_live() -> Json<serde_json::Value> {
    Json(json!({ "status": "alive" }))
}

pub async fn health_ready() -> Json<serde_json::Value> {
    Json(json!({ "status": "ready" }))
}
