// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions.
//!
//! The counters are incremented where the events happen (ledger, webhook
//! processor, generate flow). This module only describes them so the
//! exposition carries HELP lines.

use metrics::describe_counter;

/// Webhook deliveries by outcome label.
pub const WEBHOOK_EVENTS_TOTAL: &str = "pictura_webhook_events_total";
pub const CREDITS_GRANTED_TOTAL: &str = "pictura_credits_granted_total";
pub const CREDITS_SPENT_TOTAL: &str = "pictura_credits_spent_total";
pub const GENERATIONS_TOTAL: &str = "pictura_generations_total";
pub const LEDGER_CONFLICTS_TOTAL: &str = "pictura_ledger_conflicts_total";
pub const WEBHOOK_RECONCILE_REQUIRED_TOTAL: &str = "pictura_webhook_reconcile_required_total";

/// Register all Pictura metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        WEBHOOK_EVENTS_TOTAL,
        "Payment webhook deliveries by outcome"
    );
    describe_counter!(
        CREDITS_GRANTED_TOTAL,
        "Credits added by purchases and starting grants"
    );
    describe_counter!(CREDITS_SPENT_TOTAL, "Credits debited for generations");
    describe_counter!(GENERATIONS_TOTAL, "Generation requests by status");
    describe_counter!(
        LEDGER_CONFLICTS_TOTAL,
        "Balance writes that lost the version check and retried"
    );
    describe_counter!(
        WEBHOOK_RECONCILE_REQUIRED_TOTAL,
        "Credits applied whose processed-session record failed to persist"
    );
}
