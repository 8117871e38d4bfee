//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`reelgate_common::Error`] via a wrapper
//! so that route handlers can return `Result<T, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: reelgate_common::Error,
}

impl AppError {
    pub fn new(inner: reelgate_common::Error) -> Self {
        Self { inner }
    }
}

impl From<reelgate_common::Error> for AppError {
    fn from(e: reelgate_common::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            reelgate_common::Error::NotFound(_) => "not_found",
            reelgate_common::Error::Unauthorized => "unauthorized",
            reelgate_common::Error::Forbidden(_) => "forbidden",
            reelgate_common::Error::Validation(_) => "validation_error",
            reelgate_common::Error::RangeNotSatisfiable(_) => "range_not_satisfiable",
            reelgate_common::Error::ToolNotFound { .. } => "tool_not_found",
            reelgate_common::Error::ToolFailed { .. } => "tool_error",
            reelgate_common::Error::Io(_) => "io_error",
            reelgate_common::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
