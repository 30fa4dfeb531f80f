// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processed-session log: one witness row per applied payment session.

use pictura_core::{PicturaError, ProcessedSession, WitnessedCredit};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Look up the witness for a payment session.
pub async fn get_processed(
    db: &Database,
    session_id: &str,
) -> Result<Option<ProcessedSession>, PicturaError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT session_id, user_id, credits, processed_at
                 FROM processed_sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    Ok(ProcessedSession {
                        session_id: row.get(0)?,
                        user_id: row.get(1)?,
                        credits: row.get(2)?,
                        processed_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert the witness. Returns `false` if the session was already recorded;
/// the existing row is kept.
pub async fn record_processed(
    db: &Database,
    record: &ProcessedSession,
) -> Result<bool, PicturaError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO processed_sessions (session_id, user_id, credits, processed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO NOTHING",
                params![
                    record.session_id,
                    record.user_id,
                    record.credits,
                    record.processed_at,
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Credit `record.user_id` by `record.credits` and insert the witness, in one
/// transaction. Any early return drops the transaction and rolls back.
pub async fn credit_with_witness(
    db: &Database,
    record: &ProcessedSession,
) -> Result<WitnessedCredit, PicturaError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO processed_sessions (session_id, user_id, credits, processed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO NOTHING",
                params![
                    record.session_id,
                    record.user_id,
                    record.credits,
                    record.processed_at,
                ],
            )?;
            if inserted == 0 {
                return Ok(Ok(WitnessedCredit::AlreadyProcessed));
            }

            let current: Option<i64> = tx
                .query_row(
                    "SELECT credits FROM user_credits WHERE user_id = ?1",
                    params![record.user_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(Err(PicturaError::balance_not_found(record.user_id)));
            };
            let Some(new_balance) = current.checked_add(record.credits) else {
                return Ok(Err(PicturaError::Internal(format!(
                    "balance overflow for {}: {current} + {}",
                    record.user_id, record.credits
                ))));
            };

            tx.execute(
                "UPDATE user_credits
                 SET credits = ?1, version = version + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?2",
                params![new_balance, record.user_id],
            )?;
            tx.commit()?;
            Ok(Ok(WitnessedCredit::Applied { new_balance }))
        })
        .await
        .map_err(map_tr_err)?
}
