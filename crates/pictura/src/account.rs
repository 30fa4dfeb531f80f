// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pictura account` subcommands.

use std::sync::Arc;

use pictura_config::PicturaConfig;
use pictura_core::{BalanceStore, PicturaError, PluginAdapter};
use pictura_credits::CreditLedger;
use pictura_storage::SqliteStorage;

async fn open_ledger(
    config: &PicturaConfig,
) -> Result<(Arc<SqliteStorage>, CreditLedger), PicturaError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let balances: Arc<dyn BalanceStore> = storage.clone();
    let ledger = CreditLedger::new(balances, config.credits.max_update_attempts);
    Ok((storage, ledger))
}

/// Create the balance row with the starting grant. Running it twice reports
/// the existing balance.
pub async fn register(config: &PicturaConfig, user_id: &str) -> Result<(), PicturaError> {
    let (storage, ledger) = open_ledger(config).await?;
    let opening = ledger
        .open_account(user_id, config.credits.starting_grant)
        .await?;
    if opening.created {
        println!("{user_id}: account created with {} credits", opening.credits);
    } else {
        println!("{user_id}: account already exists ({} credits)", opening.credits);
    }
    storage.shutdown().await
}

pub async fn balance(config: &PicturaConfig, user_id: &str) -> Result<(), PicturaError> {
    let (storage, ledger) = open_ledger(config).await?;
    let credits = ledger.balance(user_id).await?;
    println!("{user_id}: {credits} credits");
    storage.shutdown().await
}
