// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence capabilities: balances, the processed-session log, and prompt history.

use async_trait::async_trait;

use crate::error::PicturaError;
use crate::types::{BalanceSnapshot, ProcessedSession, PromptHistoryRecord, WitnessedCredit};

/// Persistence of the single `credits` field keyed by user identifier.
///
/// Writes are conditional on the row version so that a read-modify-write
/// never silently overwrites a concurrent update.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Reads the current balance, or `None` if the user has no balance row.
    async fn get_balance(&self, user_id: &str) -> Result<Option<BalanceSnapshot>, PicturaError>;

    /// Writes `new_credits` only if the stored version still equals
    /// `expected_version`. Returns `false` when another writer got there first
    /// (or the row vanished).
    async fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: i64,
        new_credits: i64,
    ) -> Result<bool, PicturaError>;

    /// Creates the balance row. Returns `false` if it already existed, in
    /// which case the stored credits are left untouched.
    async fn create_balance(&self, user_id: &str, credits: i64) -> Result<bool, PicturaError>;
}

/// Idempotency record keyed by payment-session identifier.
#[async_trait]
pub trait SessionLog: Send + Sync {
    /// Looks up the witness for `session_id`.
    async fn get_processed(
        &self,
        session_id: &str,
    ) -> Result<Option<ProcessedSession>, PicturaError>;

    /// Records the witness. Returns `false` if one already existed.
    async fn record_processed(&self, record: &ProcessedSession) -> Result<bool, PicturaError>;
}

/// A store holding both balances and the processed-session log, able to
/// commit a payment credit and its witness in one transaction.
#[async_trait]
pub trait AtomicCreditStore: Send + Sync {
    /// Adds `record.credits` to `record.user_id` and inserts `record`.
    ///
    /// Both writes commit or neither does. An existing witness leaves the
    /// balance untouched and yields `AlreadyProcessed`. Fails with `NotFound`
    /// when the user has no balance row.
    async fn credit_with_witness(
        &self,
        record: &ProcessedSession,
    ) -> Result<WitnessedCredit, PicturaError>;
}

/// Audit log of generation requests. Nothing depends on its contents.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record_history(&self, record: &PromptHistoryRecord) -> Result<(), PicturaError>;

    /// Most recent first.
    async fn list_history(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<PromptHistoryRecord>, PicturaError>;
}
