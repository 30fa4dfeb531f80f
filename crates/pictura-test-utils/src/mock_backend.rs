// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation backend for deterministic testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pictura_core::{
    AdapterType, GenerationBackend, GenerationParams, HealthStatus, PicturaError, PluginAdapter,
};

/// A generation backend that returns one fake URL per requested output, or
/// always fails when built with [`MockBackend::failing`].
pub struct MockBackend {
    failure: Option<String>,
    calls: AtomicUsize,
    last_params: Mutex<Option<GenerationParams>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }

    /// A backend whose every call fails with `Backend { message }`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Number of `generate` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_params(&self) -> Option<GenerationParams> {
        self.last_params.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, PicturaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PicturaError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, PicturaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().await = Some(params.clone());

        if let Some(message) = &self.failure {
            return Err(PicturaError::Backend {
                message: message.clone(),
                source: None,
            });
        }
        Ok((0..params.num_outputs)
            .map(|i| format!("https://images.test/{i}.{}", params.output_format))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_one_url_per_output() {
        let backend = MockBackend::new();
        let mut params = GenerationParams::new("x");
        params.num_outputs = 3;
        let urls = backend.generate(&params).await.unwrap();
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://images.test/0.webp");
        assert_eq!(backend.calls(), 1);
        assert_eq!(backend.last_params().await.unwrap().num_outputs, 3);
    }

    #[tokio::test]
    async fn failing_backend_counts_calls() {
        let backend = MockBackend::failing("model offline");
        assert!(backend.generate(&GenerationParams::new("x")).await.is_err());
        assert_eq!(backend.calls(), 1);
    }
}
