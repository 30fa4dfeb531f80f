// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Pictura credit service.
//!
//! Serves the payment webhook, the bearer-authenticated client API, and the
//! unauthenticated health, metrics, and checkout landing routes.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HealthState, build_router, start_server};
