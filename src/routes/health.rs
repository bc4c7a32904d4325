use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "success": true,
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    });
    (StatusCode::OK, Json(body))
}
