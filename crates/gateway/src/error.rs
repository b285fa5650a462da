//! Mapping of service errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use enhancer_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, e.g. "validation_error".
    pub code: String,
    /// Caller-safe description.
    pub message: String,
    /// Trace ID of the failed request.
    pub trace_id: Option<String>,
}

/// An error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    /// Convert a service error, logging the detail the caller won't see.
    pub fn from_error(err: Error, trace_id: &str) -> Self {
        let kind = err.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(trace_id = %trace_id, error = %err, "Request failed");
        } else {
            tracing::info!(trace_id = %trace_id, error = %err, "Request rejected");
        }
        Self {
            status,
            body: ErrorResponse {
                code: kind.code().to_string(),
                message: err.public_message(),
                trace_id: Some(trace_id.to_string()),
            },
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                code: ErrorKind::Validation.code().to_string(),
                message,
                trace_id: None,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Dependency | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
