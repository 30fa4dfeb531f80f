// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod generation;
pub mod identity;
pub mod storage;

pub use adapter::PluginAdapter;
pub use generation::GenerationBackend;
pub use identity::IdentityProvider;
pub use storage::{AtomicCreditStore, BalanceStore, HistoryStore, SessionLog};
