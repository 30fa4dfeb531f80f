// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The credit ledger: the single writer of user balances.
//!
//! A delta is applied as read-modify-write guarded by the row version. When
//! a concurrent writer bumps the version between our read and write, the
//! write matches no row and the ledger re-reads and tries again, up to the
//! configured number of attempts.

use std::sync::Arc;

use pictura_core::{BalanceStore, PicturaError};
use tracing::{debug, info, warn};

/// Result of opening a user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountOpening {
    /// `true` if this call created the balance row.
    pub created: bool,
    /// Balance after the call.
    pub credits: i64,
}

/// Applies signed credit deltas to user balances.
pub struct CreditLedger {
    store: Arc<dyn BalanceStore>,
    max_attempts: u32,
}

impl CreditLedger {
    /// `max_attempts` is clamped to at least one.
    pub fn new(store: Arc<dyn BalanceStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Add `delta` (which may be negative) to the user's balance and return
    /// the newly stored balance.
    ///
    /// No floor is enforced here; spending policy belongs to the caller.
    /// Fails with `NotFound` if the user has no balance row, `Storage` if the
    /// store errors, and `ConcurrentUpdate` if every attempt lost the race.
    /// On any failure the caller must treat the delta as not applied.
    pub async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, PicturaError> {
        for attempt in 1..=self.max_attempts {
            let snapshot = self
                .store
                .get_balance(user_id)
                .await?
                .ok_or_else(|| PicturaError::balance_not_found(user_id))?;

            let new_balance = snapshot.credits.checked_add(delta).ok_or_else(|| {
                PicturaError::Internal(format!(
                    "balance overflow applying {delta} to {} for {user_id}",
                    snapshot.credits
                ))
            })?;

            if self
                .store
                .compare_and_swap(user_id, snapshot.version, new_balance)
                .await?
            {
                info!(
                    user_id = %user_id,
                    delta,
                    new_balance,
                    attempt,
                    "credit delta applied"
                );
                return Ok(new_balance);
            }

            metrics::counter!("pictura_ledger_conflicts_total").increment(1);
            debug!(
                user_id = %user_id,
                attempt,
                expected_version = snapshot.version,
                "balance version moved, retrying"
            );
        }

        warn!(
            user_id = %user_id,
            delta,
            attempts = self.max_attempts,
            "giving up on contended balance"
        );
        Err(PicturaError::ConcurrentUpdate {
            user_id: user_id.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Current balance, or `NotFound` if the user has no row.
    pub async fn balance(&self, user_id: &str) -> Result<i64, PicturaError> {
        self.store
            .get_balance(user_id)
            .await?
            .map(|snapshot| snapshot.credits)
            .ok_or_else(|| PicturaError::balance_not_found(user_id))
    }

    /// Create the user's balance row with `starting_grant` credits.
    ///
    /// An existing row is left unchanged and reported with `created: false`,
    /// so registering twice never grants twice.
    pub async fn open_account(
        &self,
        user_id: &str,
        starting_grant: i64,
    ) -> Result<AccountOpening, PicturaError> {
        let created = self.store.create_balance(user_id, starting_grant).await?;
        if created {
            info!(user_id = %user_id, starting_grant, "account opened");
            metrics::counter!("pictura_credits_granted_total")
                .increment(starting_grant.unsigned_abs());
        }
        let credits = self.balance(user_id).await?;
        Ok(AccountOpening { created, credits })
    }
}
