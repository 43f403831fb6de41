use axum::Json;
use serde_json::Value;

use super::acknowledged;

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    acknowledged()
}
