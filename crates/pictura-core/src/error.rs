// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Pictura credit service.

use thiserror::Error;

/// The primary error type used across all Pictura traits and core operations.
#[derive(Debug, Error)]
pub enum PicturaError {
    /// Configuration errors (invalid TOML, missing required secrets, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Balance store, session log, or history store could not be reached or failed.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A required row does not exist (e.g. no balance row for the user).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Inbound webhook payload failed signature verification.
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Webhook payload passed verification but could not be parsed.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The optimistic version check lost every attempt against concurrent writers.
    #[error("concurrent update on balance for {user_id} after {attempts} attempts")]
    ConcurrentUpdate { user_id: String, attempts: u32 },

    /// The caller's balance does not cover the requested generation.
    #[error("Not enough credits. You need {required} credits for {outputs} output(s).")]
    InsufficientCredits {
        required: i64,
        available: i64,
        outputs: u8,
    },

    /// Client request failed input validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Caller identity could not be resolved.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An external backend (image generation, payment API) failed.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PicturaError {
    /// Shorthand for a missing balance row.
    pub fn balance_not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "balance",
            id: user_id.into(),
        }
    }
}
