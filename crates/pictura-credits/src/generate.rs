// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Charge-then-generate: the client-facing consumption of credits.

use std::sync::Arc;

use pictura_core::{
    GenerationBackend, GenerationParams, HistoryStore, PicturaError, PromptHistoryRecord,
    UserIdentity,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::ledger::CreditLedger;
use crate::pricing::Pricing;

/// What a successful generation returns to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateReceipt {
    pub images: Vec<String>,
    pub credits_charged: i64,
    pub credits_remaining: i64,
}

/// Debits the caller, records the prompt, and invokes the backend.
pub struct GenerateFlow {
    ledger: Arc<CreditLedger>,
    history: Arc<dyn HistoryStore>,
    backend: Arc<dyn GenerationBackend>,
    pricing: Pricing,
}

impl GenerateFlow {
    pub fn new(
        ledger: Arc<CreditLedger>,
        history: Arc<dyn HistoryStore>,
        backend: Arc<dyn GenerationBackend>,
        pricing: Pricing,
    ) -> Self {
        Self {
            ledger,
            history,
            backend,
            pricing,
        }
    }

    /// Run one generation for `identity`.
    ///
    /// An unaffordable request fails with `InsufficientCredits` before the
    /// backend is contacted. Once the debit is applied it is kept even if the
    /// backend fails.
    pub async fn generate(
        &self,
        identity: &UserIdentity,
        params: &GenerationParams,
    ) -> Result<GenerateReceipt, PicturaError> {
        params.validate()?;
        let user_id = identity.user_id.as_str();
        let cost = self.pricing.generation_cost(params.num_outputs)?;

        let available = self.ledger.balance(user_id).await?;
        if available < cost {
            info!(
                user_id = %user_id,
                cost,
                available,
                "generation rejected: insufficient credits"
            );
            return Err(PicturaError::InsufficientCredits {
                required: cost,
                available,
                outputs: params.num_outputs,
            });
        }

        let credits_remaining = self.ledger.apply_delta(user_id, -cost).await?;
        metrics::counter!("pictura_credits_spent_total").increment(cost.unsigned_abs());

        self.record_history(user_id, params, cost).await;

        match self.backend.generate(params).await {
            Ok(images) => {
                metrics::counter!("pictura_generations_total", "status" => "succeeded")
                    .increment(1);
                info!(
                    user_id = %user_id,
                    outputs = images.len(),
                    credits_remaining,
                    "generation succeeded"
                );
                Ok(GenerateReceipt {
                    images,
                    credits_charged: cost,
                    credits_remaining,
                })
            }
            Err(e) => {
                metrics::counter!("pictura_generations_total", "status" => "failed").increment(1);
                warn!(
                    user_id = %user_id,
                    credits_charged = cost,
                    error = %e,
                    "generation failed after debit; credits not refunded"
                );
                Err(e)
            }
        }
    }

    async fn record_history(&self, user_id: &str, params: &GenerationParams, cost: i64) {
        let params_json = match serde_json::to_string(params) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to serialize generation params for history");
                return;
            }
        };
        let record = PromptHistoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            prompt: params.prompt.clone(),
            params: params_json,
            credits_charged: cost,
            created_at: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        };
        if let Err(e) = self.history.record_history(&record).await {
            error!(user_id = %user_id, error = %e, "failed to record prompt history");
        }
    }
}
