// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image-generation backend adapter.
//!
//! Talks to a Replicate-style predictions API: create a prediction for the
//! configured model, wait for it synchronously when the backend allows, and
//! poll its status URL otherwise.

pub mod client;
pub mod types;

pub use client::PredictionClient;
