// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from `PicturaError` to HTTP responses on the client API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use pictura_core::PicturaError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error ready to be returned from a client-facing handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

/// Status code for an error surfaced to an authenticated client.
pub fn client_status(err: &PicturaError) -> StatusCode {
    match err {
        PicturaError::NotFound { .. } => StatusCode::NOT_FOUND,
        PicturaError::SignatureInvalid(_)
        | PicturaError::MalformedEvent(_)
        | PicturaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PicturaError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        PicturaError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
        PicturaError::ConcurrentUpdate { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PicturaError::Backend { .. } => StatusCode::BAD_GATEWAY,
        PicturaError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PicturaError::Config(_) | PicturaError::Storage { .. } | PicturaError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<PicturaError> for ApiError {
    fn from(err: PicturaError) -> Self {
        let status = client_status(&err);
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
            "internal server error".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(error = %err, status = %status, "request failed");
            }
            err.to_string()
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
