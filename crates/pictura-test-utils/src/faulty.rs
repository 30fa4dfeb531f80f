// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stores that fail on purpose, for exercising error paths.

use std::sync::Arc;

use async_trait::async_trait;

use pictura_core::{
    BalanceSnapshot, BalanceStore, HistoryStore, PicturaError, ProcessedSession,
    PromptHistoryRecord, SessionLog,
};

fn unavailable(what: &str) -> PicturaError {
    PicturaError::Storage {
        source: format!("{what} unavailable (injected)").into(),
    }
}

/// Balance store that cannot be reached.
pub struct UnavailableBalanceStore;

#[async_trait]
impl BalanceStore for UnavailableBalanceStore {
    async fn get_balance(&self, _user_id: &str) -> Result<Option<BalanceSnapshot>, PicturaError> {
        Err(unavailable("balance store"))
    }

    async fn compare_and_swap(
        &self,
        _user_id: &str,
        _expected_version: i64,
        _new_credits: i64,
    ) -> Result<bool, PicturaError> {
        Err(unavailable("balance store"))
    }

    async fn create_balance(&self, _user_id: &str, _credits: i64) -> Result<bool, PicturaError> {
        Err(unavailable("balance store"))
    }
}

/// Session log that answers lookups from `inner` but fails every write.
pub struct WriteFailingSessionLog {
    inner: Arc<dyn SessionLog>,
}

impl WriteFailingSessionLog {
    pub fn new(inner: Arc<dyn SessionLog>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SessionLog for WriteFailingSessionLog {
    async fn get_processed(
        &self,
        session_id: &str,
    ) -> Result<Option<ProcessedSession>, PicturaError> {
        self.inner.get_processed(session_id).await
    }

    async fn record_processed(&self, _record: &ProcessedSession) -> Result<bool, PicturaError> {
        Err(unavailable("session log"))
    }
}

/// Session log whose lookups fail, so nothing can be applied.
pub struct UnavailableSessionLog;

#[async_trait]
impl SessionLog for UnavailableSessionLog {
    async fn get_processed(
        &self,
        _session_id: &str,
    ) -> Result<Option<ProcessedSession>, PicturaError> {
        Err(unavailable("session log"))
    }

    async fn record_processed(&self, _record: &ProcessedSession) -> Result<bool, PicturaError> {
        Err(unavailable("session log"))
    }
}

/// History store that rejects every write and lists nothing.
pub struct FailingHistory;

#[async_trait]
impl HistoryStore for FailingHistory {
    async fn record_history(&self, _record: &PromptHistoryRecord) -> Result<(), PicturaError> {
        Err(unavailable("history store"))
    }

    async fn list_history(
        &self,
        _user_id: &str,
        _limit: u32,
    ) -> Result<Vec<PromptHistoryRecord>, PicturaError> {
        Err(unavailable("history store"))
    }
}
