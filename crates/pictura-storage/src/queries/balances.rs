// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balance rows with version-conditioned writes.

use pictura_core::{BalanceSnapshot, PicturaError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Read credits and version for a user.
pub async fn get_balance(
    db: &Database,
    user_id: &str,
) -> Result<Option<BalanceSnapshot>, PicturaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT credits, version FROM user_credits WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(BalanceSnapshot {
                        credits: row.get(0)?,
                        version: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Write `new_credits` if the row is still at `expected_version`, bumping the version.
///
/// Returns `false` when no row matched.
pub async fn compare_and_swap(
    db: &Database,
    user_id: &str,
    expected_version: i64,
    new_credits: i64,
) -> Result<bool, PicturaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE user_credits
                 SET credits = ?1, version = version + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?2 AND version = ?3",
                params![new_credits, user_id, expected_version],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a balance row unless one exists.
pub async fn create_balance(
    db: &Database,
    user_id: &str,
    credits: i64,
) -> Result<bool, PicturaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO user_credits (user_id, credits) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO NOTHING",
                params![user_id, credits],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}
