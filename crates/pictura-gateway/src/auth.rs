// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication middleware.
//!
//! The token is resolved to a [`UserIdentity`] on every request and handed
//! to handlers through request extensions.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use pictura_core::UserIdentity;

use crate::error::ApiError;
use crate::server::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request with 401 unless it carries a valid session token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

    let identity: UserIdentity = state
        .identity
        .authenticate(token)
        .await
        .map_err(|_| ApiError::new(StatusCode::UNAUTHORIZED, "invalid session token"))?;

    tracing::debug!(user_id = %identity.user_id, "request authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
