// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity provider trait for resolving callers at request time.

use async_trait::async_trait;

use crate::error::PicturaError;
use crate::types::UserIdentity;

/// Resolves an opaque session token into a verified user identity.
///
/// Called once per request; implementations must not keep ambient
/// per-user state between calls.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<UserIdentity, PicturaError>;
}
