use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult, OrInternal};
use crate::api::AppState;
use crate::features::get_version;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": get_version(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

/// Every distinct circle across all contacts.
pub async fn list_circles(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let circles = state
        .database
        .list_circles()
        .await
        .or_internal("Failed to retrieve circles")?;
    Ok(Json(circles))
}

/// Unknown paths under `/api` answer with JSON rather than the frontend.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such endpoint".to_string())
}
