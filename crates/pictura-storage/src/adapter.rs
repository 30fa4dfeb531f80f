// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the balance, session-log, and history traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use pictura_config::model::StorageConfig;
use pictura_core::{
    AdapterType, AtomicCreditStore, BalanceSnapshot, BalanceStore, HealthStatus, HistoryStore,
    PicturaError, PluginAdapter, ProcessedSession, PromptHistoryRecord, SessionLog,
    WitnessedCredit,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened lazily by [`SqliteStorage::initialize`]; every
/// trait method fails with `PicturaError::Storage` until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. No file is touched until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and apply migrations.
    pub async fn initialize(&self) -> Result<(), PicturaError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| PicturaError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, PicturaError> {
        self.db.get().ok_or_else(|| PicturaError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PicturaError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PicturaError> {
        if let Some(db) = self.db.get()
            && self.config.wal_mode
        {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for SqliteStorage {
    async fn get_balance(&self, user_id: &str) -> Result<Option<BalanceSnapshot>, PicturaError> {
        queries::balances::get_balance(self.db()?, user_id).await
    }

    async fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: i64,
        new_credits: i64,
    ) -> Result<bool, PicturaError> {
        queries::balances::compare_and_swap(self.db()?, user_id, expected_version, new_credits)
            .await
    }

    async fn create_balance(&self, user_id: &str, credits: i64) -> Result<bool, PicturaError> {
        queries::balances::create_balance(self.db()?, user_id, credits).await
    }
}

#[async_trait]
impl SessionLog for SqliteStorage {
    async fn get_processed(
        &self,
        session_id: &str,
    ) -> Result<Option<ProcessedSession>, PicturaError> {
        queries::sessions::get_processed(self.db()?, session_id).await
    }

    async fn record_processed(&self, record: &ProcessedSession) -> Result<bool, PicturaError> {
        queries::sessions::record_processed(self.db()?, record).await
    }
}

#[async_trait]
impl AtomicCreditStore for SqliteStorage {
    async fn credit_with_witness(
        &self,
        record: &ProcessedSession,
    ) -> Result<WitnessedCredit, PicturaError> {
        queries::sessions::credit_with_witness(self.db()?, record).await
    }
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn record_history(&self, record: &PromptHistoryRecord) -> Result<(), PicturaError> {
        queries::history::insert_history(self.db()?, record).await
    }

    async fn list_history(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<PromptHistoryRecord>, PicturaError> {
        queries::history::list_history(self.db()?, user_id, limit).await
    }
}
