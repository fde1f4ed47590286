//! Mapping from domain outcomes to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::common::DomainError;

/// Error returned by every API handler. Bodies are `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Domain(DomainError),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided or are invalid".to_string(),
            ),
            Self::Domain(e) => match e {
                DomainError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                DomainError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                DomainError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                DomainError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                DomainError::PaymentGateway(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                DomainError::Internal(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Domain(e @ DomainError::Internal(_)) = &self {
            error!(error = %e, "Request failed");
        }
        let (status, detail) = self.status_and_detail();
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
