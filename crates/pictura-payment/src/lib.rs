// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment provider integration for the Pictura credit service.
//!
//! Inbound: signed webhook events are verified ([`WebhookVerifier`]) and
//! turned into at most one ledger credit per checkout session
//! ([`WebhookProcessor`]). Outbound: [`CheckoutClient`] creates hosted
//! checkout sessions for the configured credit packages.

pub mod checkout;
pub mod event;
pub mod signature;
pub mod webhook;

pub use checkout::{CheckoutClient, CheckoutLink};
pub use event::{CheckoutSession, WebhookEvent};
pub use signature::{SIGNATURE_HEADER, WebhookVerifier};
pub use webhook::{SkipReason, WebhookOutcome, WebhookProcessor};
