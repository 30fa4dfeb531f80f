// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-signed session tokens.
//!
//! Format: `v1.<hex user id>.<expiry unix seconds>.<hex HMAC-SHA256>`, where
//! the MAC covers everything before the last dot. The user id is hex-encoded
//! so it may contain dots.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use pictura_core::{IdentityProvider, PicturaError, UserIdentity};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// Issues and verifies session tokens with a shared secret.
pub struct SessionTokens {
    secret: SecretString,
    ttl_secs: u64,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("secret", &"[redacted]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl SessionTokens {
    pub fn new(secret: SecretString, ttl_secs: u64) -> Self {
        Self { secret, ttl_secs }
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: &str) -> Result<String, PicturaError> {
        self.issue_at(user_id, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, user_id: &str, now: i64) -> Result<String, PicturaError> {
        if user_id.is_empty() {
            return Err(PicturaError::InvalidRequest(
                "user id must not be empty".to_string(),
            ));
        }
        let ttl = i64::try_from(self.ttl_secs)
            .map_err(|_| PicturaError::Config("auth.token_ttl_secs is too large".to_string()))?;
        let expires = now
            .checked_add(ttl)
            .ok_or_else(|| PicturaError::Internal("token expiry overflow".to_string()))?;

        let body = format!("{TOKEN_VERSION}.{}.{expires}", hex::encode(user_id));
        let tag = hex::encode(self.mac(&body)?.finalize().into_bytes());
        Ok(format!("{body}.{tag}"))
    }

    /// Verify a token as if the current time were `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<UserIdentity, PicturaError> {
        let (body, tag) = token
            .rsplit_once('.')
            .ok_or_else(|| unauthorized("malformed token"))?;
        if !tag.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(unauthorized("malformed token"));
        }
        let tag = hex::decode(tag).map_err(|_| unauthorized("malformed token"))?;
        self.mac(body)?
            .verify_slice(&tag)
            .map_err(|_| unauthorized("bad token signature"))?;

        let mut parts = body.split('.');
        let (Some(version), Some(user_hex), Some(expires), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(unauthorized("malformed token"));
        };
        if version != TOKEN_VERSION {
            return Err(unauthorized("unsupported token version"));
        }
        let expires: i64 = expires
            .parse()
            .map_err(|_| unauthorized("malformed token"))?;
        if now >= expires {
            return Err(unauthorized("token expired"));
        }
        let user_id = hex::decode(user_hex)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| unauthorized("malformed token"))?;

        Ok(UserIdentity { user_id })
    }

    fn mac(&self, body: &str) -> Result<HmacSha256, PicturaError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| PicturaError::Internal(format!("invalid session key: {e}")))?;
        mac.update(body.as_bytes());
        Ok(mac)
    }
}

fn unauthorized(reason: &str) -> PicturaError {
    PicturaError::Unauthorized(reason.to_string())
}

#[async_trait]
impl IdentityProvider for SessionTokens {
    async fn authenticate(&self, token: &str) -> Result<UserIdentity, PicturaError> {
        let result = self.verify_at(token, chrono::Utc::now().timestamp());
        if let Err(e) = &result {
            debug!(error = %e, "session token rejected");
        }
        result
    }
}
