// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security primitives for the Pictura credit service.
//!
//! Provides secret redaction for log output and HMAC-signed session tokens
//! that resolve a caller's identity per request.

pub mod redact;
pub mod token;

pub use redact::{RedactingWriter, redact};
pub use token::SessionTokens;
