// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the predictions API.
//!
//! The create call asks the backend to hold the connection until the
//! prediction finishes (`Prefer: wait`). If it comes back still running, the
//! client polls `urls.get` until a terminal state or the overall timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use pictura_config::model::GenerationConfig;
use pictura_core::{
    AdapterType, GenerationBackend, GenerationParams, HealthStatus, PicturaError, PluginAdapter,
};

use crate::types::{ApiErrorResponse, Prediction, PredictionRequest, PredictionStatus};

/// Predictions API client bound to one model.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    poll_interval: Duration,
    max_retries: u32,
}

impl PredictionClient {
    pub fn new(config: &GenerationConfig, api_token: SecretString) -> Result<Self, PicturaError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_token.expose_secret()))
            .map_err(|e| PicturaError::Config(format!("invalid generation API token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PicturaError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Create a prediction, retrying transient statuses (429, 500, 503).
    async fn create(&self, params: &GenerationParams) -> Result<Prediction, PicturaError> {
        let url = format!("{}/v1/models/{}/predictions", self.base_url, self.model);
        let body = PredictionRequest { input: params };
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying prediction request after transient error");
                tokio::time::sleep(self.poll_interval).await;
            }

            let response = self
                .client
                .post(&url)
                .header("Prefer", "wait")
                .json(&body)
                .send()
                .await
                .map_err(|e| PicturaError::Backend {
                    message: format!("prediction request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "prediction response received");

            if status.is_success() {
                return read_prediction(response).await;
            }

            let text = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(api_error(status, &text));
                continue;
            }
            return Err(api_error(status, &text));
        }

        Err(last_error.unwrap_or_else(|| PicturaError::Backend {
            message: "prediction request failed after retries".into(),
            source: None,
        }))
    }

    async fn fetch(&self, url: &str) -> Result<Prediction, PicturaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PicturaError::Backend {
                message: format!("prediction poll failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }
        read_prediction(response).await
    }

    async fn run(&self, params: &GenerationParams) -> Result<Vec<String>, PicturaError> {
        let mut prediction = self.create(params).await?;
        debug!(id = %prediction.id, status = ?prediction.status, "prediction created");

        while !prediction.status.is_terminal() {
            let Some(urls) = prediction.urls.as_ref() else {
                return Err(PicturaError::Backend {
                    message: format!("prediction {} is pending without a status URL", prediction.id),
                    source: None,
                });
            };
            let poll_url = urls.get.clone();
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.fetch(&poll_url).await?;
        }

        match prediction.status {
            PredictionStatus::Succeeded => {
                let urls = prediction.output_urls();
                if urls.is_empty() {
                    return Err(PicturaError::Backend {
                        message: format!("prediction {} succeeded without output", prediction.id),
                        source: None,
                    });
                }
                info!(id = %prediction.id, outputs = urls.len(), "prediction succeeded");
                Ok(urls)
            }
            _ => Err(PicturaError::Backend {
                message: format!("generation failed: {}", prediction.error_message()),
                source: None,
            }),
        }
    }
}

async fn read_prediction(response: reqwest::Response) -> Result<Prediction, PicturaError> {
    let text = response.text().await.map_err(|e| PicturaError::Backend {
        message: format!("failed to read prediction response: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&text).map_err(|e| PicturaError::Backend {
        message: format!("failed to parse prediction response: {e}"),
        source: Some(Box::new(e)),
    })
}

fn api_error(status: reqwest::StatusCode, body: &str) -> PicturaError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(ApiErrorResponse {
            detail: Some(detail),
            ..
        }) => format!("generation API error ({status}): {detail}"),
        Ok(ApiErrorResponse {
            title: Some(title),
            ..
        }) => format!("generation API error ({status}): {title}"),
        _ => format!("generation API returned {status}"),
    };
    PicturaError::Backend {
        message,
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[async_trait]
impl PluginAdapter for PredictionClient {
    fn name(&self) -> &str {
        "predictions"
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
impl GenerationBackend for PredictionClient {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, PicturaError> {
        tokio::time::timeout(self.timeout, self.run(params))
            .await
            .map_err(|_| PicturaError::Timeout {
                duration: self.timeout,
            })?
    }
}
