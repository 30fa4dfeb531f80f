// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for building signed webhook deliveries.

use secrecy::SecretString;

use pictura_payment::WebhookVerifier;

/// Event id, session id, user, and amount of one completed checkout.
pub struct CheckoutFixture<'a> {
    pub event_id: &'a str,
    pub session_id: &'a str,
    pub user_id: Option<&'a str>,
    /// Minor currency units.
    pub amount_total: Option<i64>,
    pub payment_status: &'a str,
}

impl<'a> CheckoutFixture<'a> {
    /// A paid checkout for `user_id`.
    pub fn paid(session_id: &'a str, user_id: &'a str, amount_total: i64) -> Self {
        Self {
            event_id: "evt_test",
            session_id,
            user_id: Some(user_id),
            amount_total: Some(amount_total),
            payment_status: "paid",
        }
    }

    /// JSON body of a `checkout.session.completed` event.
    pub fn payload(&self) -> Vec<u8> {
        serde_json::json!({
            "id": self.event_id,
            "object": "event",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": self.session_id,
                    "object": "checkout.session",
                    "client_reference_id": self.user_id,
                    "amount_total": self.amount_total,
                    "currency": "usd",
                    "payment_status": self.payment_status,
                }
            }
        })
        .to_string()
        .into_bytes()
    }
}

/// JSON body of an event type the processor does not handle.
pub fn unrelated_event(event_type: &str) -> Vec<u8> {
    serde_json::json!({
        "id": "evt_other",
        "type": event_type,
        "data": { "object": { "id": "pi_1" } }
    })
    .to_string()
    .into_bytes()
}

/// Signature header for `payload` under `secret`, timestamped now.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    sign_payload_at(secret, payload, chrono::Utc::now().timestamp())
}

/// Signature header for `payload` under `secret` at `timestamp`.
pub fn sign_payload_at(secret: &str, payload: &[u8], timestamp: i64) -> String {
    WebhookVerifier::new(SecretString::from(secret.to_string()), 300)
        .sign(payload, timestamp)
        .unwrap_or_default()
}
