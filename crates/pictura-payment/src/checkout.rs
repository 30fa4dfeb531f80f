// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hosted checkout sessions for buying credit packages.
//!
//! Creating a session grants nothing. Credits arrive only through the
//! verified `checkout.session.completed` webhook, which reads back the
//! `client_reference_id` set here.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pictura_config::model::PaymentConfig;
use pictura_core::PicturaError;
use pictura_credits::Pricing;

/// Where to send the user to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLink {
    pub session_id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the payment provider's checkout-session API.
pub struct CheckoutClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    currency: String,
    success_url: String,
    cancel_url: String,
    pricing: Pricing,
}

impl CheckoutClient {
    pub fn new(
        config: &PaymentConfig,
        api_key: SecretString,
        pricing: Pricing,
    ) -> Result<Self, PicturaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PicturaError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
            pricing,
        })
    }

    /// Create a checkout session for the package worth `amount` whole
    /// currency units, on behalf of `user_id`.
    pub async fn create_session(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<CheckoutLink, PicturaError> {
        let unit_amount = self.pricing.package_amount_minor(amount)?;
        let credits = self.pricing.credits_for_amount(unit_amount)?;

        let form = [
            ("mode", "payment".to_string()),
            ("client_reference_id", user_id.to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][unit_amount]", unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("{credits} Pictura credits"),
            ),
            ("metadata[credits]", credits.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(|e| PicturaError::Backend {
                message: format!("checkout request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "checkout session response received");
        let body = response.text().await.map_err(|e| PicturaError::Backend {
            message: format!("failed to read checkout response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|r| format!("payment API error ({status}): {}", r.error.message))
                .unwrap_or_else(|_| format!("payment API returned {status}"));
            return Err(PicturaError::Backend {
                message,
                source: None,
            });
        }

        #[derive(Deserialize)]
        struct SessionResponse {
            id: String,
            url: Option<String>,
        }
        let session: SessionResponse =
            serde_json::from_str(&body).map_err(|e| PicturaError::Backend {
                message: format!("failed to parse checkout response: {e}"),
                source: Some(Box::new(e)),
            })?;
        let url = session.url.ok_or_else(|| PicturaError::Backend {
            message: format!("checkout session {} has no url", session.id),
            source: None,
        })?;

        info!(
            user_id = %user_id,
            session_id = %session.id,
            amount,
            credits,
            "checkout session created"
        );
        Ok(CheckoutLink {
            session_id: session.id,
            url,
        })
    }
}
