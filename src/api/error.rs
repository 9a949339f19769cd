use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::services::ServiceError;

/// HTTP-facing wrapper over `ServiceError`. Handlers return
/// `Result<_, ApiError>` and let `?` do the mapping.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError(ServiceError::internal(message))
    }

    fn status_and_body(&self) -> (StatusCode, String, String) {
        match &self.0 {
            ServiceError::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, code.to_string(), message.clone())
            }
            ServiceError::Conflict { code, message } => {
                (StatusCode::CONFLICT, code.to_string(), message.clone())
            }
            ServiceError::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, code.to_string(), message.clone())
            }
            ServiceError::Validation { code, message } => {
                (StatusCode::BAD_REQUEST, code.clone(), message.clone())
            }
            ServiceError::Database(e) => {
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVER_ERROR".to_string(),
                    "Internal server error".to_string(),
                )
            }
            ServiceError::Internal(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVER_ERROR".to_string(),
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_body();
        let body = Json(json!({
            "error": { "code": code, "message": message },
            "details": null,
        }));
        (status, body).into_response()
    }
}
