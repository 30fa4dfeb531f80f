// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Pictura integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockBackend`] - Generation backend returning canned image URLs
//! - [`faulty`] - Stores that fail on purpose
//! - [`webhook`] - Signed checkout event payloads
//! - [`TestHarness`] - Full gateway wired to a temp SQLite database

pub mod faulty;
pub mod harness;
pub mod mock_backend;
pub mod webhook;

pub use harness::{SESSION_SECRET, TestHarness, WEBHOOK_SECRET};
pub use mock_backend::MockBackend;
