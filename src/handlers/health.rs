use axum::Json;
use serde_json::{json, Value};

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Auth"
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
