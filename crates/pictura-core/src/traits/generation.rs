// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image-generation backend trait.

use async_trait::async_trait;

use crate::error::PicturaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::GenerationParams;

/// Adapter for the external text-to-image backend.
#[async_trait]
pub trait GenerationBackend: PluginAdapter {
    /// Runs one generation to completion and returns the output image URLs.
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, PicturaError>;
}
