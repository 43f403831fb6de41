//! HTTP error mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::ServiceError;

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request body or query string did not match the expected shape.
    #[error("invalid payload: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Service(err) => match err {
                ServiceError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                ServiceError::Unauthenticated => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized".into())
                }
                ServiceError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".into()),
                ServiceError::NotFound(entity) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{} not found", capitalize(entity)),
                ),
                ServiceError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", (*msg).into()),
                ServiceError::NotConfigured => (
                    StatusCode::NOT_IMPLEMENTED,
                    "NOT_CONFIGURED",
                    "Database not configured".into(),
                ),
                other => {
                    tracing::error!(error = %other, "request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".into(),
                    )
                }
            },
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::StorageError;

    fn status_and_code(err: AppError) -> (StatusCode, &'static str) {
        let (status, code, _) = err.parts();
        (status, code)
    }

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden, StatusCode::FORBIDDEN),
            (ServiceError::NotFound("lesson"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("taken"), StatusCode::CONFLICT),
            (ServiceError::NotConfigured, StatusCode::NOT_IMPLEMENTED),
        ];
        for (err, expected) in cases {
            assert_eq!(status_and_code(err.into()).0, expected);
        }
    }

    #[test]
    fn storage_failures_hide_details() {
        let err = AppError::from(ServiceError::Storage(StorageError::Connection(
            "disk on fire".into(),
        )));
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("disk"));
    }

    #[test]
    fn not_found_names_the_entity() {
        let (_, _, message) = AppError::from(ServiceError::NotFound("game")).parts();
        assert_eq!(message, "Game not found");
    }
}
