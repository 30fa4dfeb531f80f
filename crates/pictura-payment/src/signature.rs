// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! The provider sends `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! Each `v1` is HMAC-SHA256 over `"<t>." ++ raw body`, keyed with the
//! endpoint's signing secret. Any listed `v1` may match.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use pictura_core::PicturaError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Verifies webhook payloads against the shared signing secret.
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: u64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[redacted]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: SecretString, tolerance_secs: u64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    /// Verify `payload` against `header` using the current time.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), PicturaError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify `payload` against `header` as if the current time were `now`.
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<(), PicturaError> {
        let header = header.ok_or_else(|| invalid("missing signature header"))?;
        let (timestamp, signatures) = parse_header(header)?;

        if now.abs_diff(timestamp) > self.tolerance_secs {
            return Err(invalid("timestamp outside tolerance"));
        }

        let mac = self.mac(timestamp, payload)?;
        if signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok())
        {
            Ok(())
        } else {
            Err(invalid("no matching v1 signature"))
        }
    }

    /// Build a header value for `payload` signed at `timestamp`.
    ///
    /// This is what the provider does; useful for tests and local replay.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, PicturaError> {
        let tag = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(tag)))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, PicturaError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| PicturaError::Internal(format!("invalid webhook secret: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

fn invalid(reason: &str) -> PicturaError {
    PicturaError::SignatureInvalid(reason.to_string())
}

/// Split the header into its timestamp and decoded `v1` signatures.
///
/// Other schemes (e.g. `v0`) are ignored.
fn parse_header(header: &str) -> Result<(i64, Vec<Vec<u8>>), PicturaError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for item in header.split(',') {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| invalid("malformed signature header"))?;
        match key {
            "t" => {
                if timestamp.is_some() {
                    return Err(invalid("duplicate timestamp"));
                }
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("non-numeric timestamp"));
                }
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| invalid("non-numeric timestamp"))?,
                );
            }
            "v1" => {
                if !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
                    return Err(invalid("signature is not lowercase hex"));
                }
                signatures.push(hex::decode(value).map_err(|_| invalid("signature is not hex"))?);
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("missing v1 signature"));
    }
    Ok((timestamp, signatures))
}
