//! HTTP error mapping: wraps `SchedulerError` in the status-code + JSON-body
//! shape handlers return.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug)]
pub struct AppError(pub SchedulerError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            SchedulerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            SchedulerError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            SchedulerError::NoSlot(_) => (StatusCode::UNPROCESSABLE_ENTITY, "NO_SLOT"),
            SchedulerError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            SchedulerError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            SchedulerError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            SchedulerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(ApiError::new(code, self.0.to_string()))).into_response()
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        AppError(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError(SchedulerError::Internal(err))
    }
}
