// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook event model. Unknown fields are ignored.

use std::collections::HashMap;

use serde::Deserialize;

use pictura_core::PicturaError;

/// The only event type that grants credits.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Event envelope: `{ id, type, data: { object } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The fields of a checkout session this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// The user the session was created for. Sole source of identity.
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Total charged, in minor currency units. Sole source of the credit delta.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl WebhookEvent {
    /// Parse a verified raw payload.
    pub fn parse(payload: &[u8]) -> Result<Self, PicturaError> {
        serde_json::from_slice(payload)
            .map_err(|e| PicturaError::MalformedEvent(format!("invalid event envelope: {e}")))
    }

    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }

    /// Interpret `data.object` as a checkout session.
    pub fn checkout_session(&self) -> Result<CheckoutSession, PicturaError> {
        CheckoutSession::deserialize(&self.data.object)
            .map_err(|e| PicturaError::MalformedEvent(format!("invalid checkout session: {e}")))
    }
}

impl CheckoutSession {
    /// `client_reference_id` exactly as sent, if present and non-blank.
    pub fn user_id(&self) -> Option<&str> {
        self.client_reference_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    /// Credits our checkout client promised in metadata. Informational only.
    pub fn promised_credits(&self) -> Option<i64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("credits"))
            .and_then(|c| c.parse().ok())
    }
}
