// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt history.

use pictura_core::{PicturaError, PromptHistoryRecord};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Append a history record.
pub async fn insert_history(
    db: &Database,
    record: &PromptHistoryRecord,
) -> Result<(), PicturaError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO prompt_history (id, user_id, prompt, params, credits_charged, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.user_id,
                    record.prompt,
                    record.params,
                    record.credits_charged,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recent records for a user, newest first.
pub async fn list_history(
    db: &Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<PromptHistoryRecord>, PicturaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, prompt, params, credits_charged, created_at
                 FROM prompt_history WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok(PromptHistoryRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    prompt: row.get(2)?,
                    params: row.get(3)?,
                    credits_charged: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
