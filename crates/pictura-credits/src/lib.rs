// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit accounting for the Pictura service.
//!
//! The [`CreditLedger`] is the only writer of balances. [`Pricing`] turns
//! payments and generation requests into credit amounts, and
//! [`GenerateFlow`] charges a user before invoking the generation backend.

pub mod generate;
pub mod ledger;
pub mod pricing;

pub use generate::{GenerateFlow, GenerateReceipt};
pub use ledger::{AccountOpening, CreditLedger};
pub use pricing::Pricing;
