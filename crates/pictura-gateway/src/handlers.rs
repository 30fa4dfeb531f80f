// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use pictura_core::{
    GenerationParams, HealthStatus, PicturaError, PromptHistoryRecord, UserIdentity,
};
use pictura_credits::GenerateReceipt;
use pictura_payment::{CheckoutLink, SIGNATURE_HEADER, WebhookOutcome};

use crate::error::{ApiError, ErrorResponse};
use crate::server::AppState;

/// Default number of history entries returned.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
/// Upper bound on `?limit=` for history.
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// Response body for balance reads and account opening.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub credits: i64,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Package price in whole currency units.
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub prompt: String,
    pub params: serde_json::Value,
    pub credits_charged: i64,
    pub created_at: String,
}

impl From<PromptHistoryRecord> for HistoryEntry {
    fn from(record: PromptHistoryRecord) -> Self {
        let params = serde_json::from_str(&record.params)
            .unwrap_or(serde_json::Value::String(record.params));
        Self {
            id: record.id,
            prompt: record.prompt,
            params,
            credits_charged: record.credits_charged,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text()))
}

/// POST /webhook
///
/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn post_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    match state.webhooks.handle(&body, signature).await {
        Ok(outcome) => {
            if let WebhookOutcome::Skipped { session_id, reason } = &outcome {
                tracing::info!(
                    session_id = %session_id,
                    reason = %reason,
                    "webhook acknowledged without credit"
                );
            }
            (StatusCode::OK, Json(WebhookAck { received: true })).into_response()
        }
        Err(e @ (PicturaError::SignatureInvalid(_) | PicturaError::MalformedEvent(_))) => {
            tracing::warn!(error = %e, "webhook rejected");
            ApiError::new(StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            // A non-2xx makes the provider redeliver.
            tracing::error!(error = %e, "webhook processing failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "webhook processing failed")
                .into_response()
        }
    }
}

/// POST /v1/account
pub async fn post_account(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Response, ApiError> {
    let opening = state
        .ledger
        .open_account(&identity.user_id, state.starting_grant)
        .await?;
    let status = if opening.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = BalanceResponse {
        user_id: identity.user_id,
        credits: opening.credits,
    };
    Ok((status, Json(body)).into_response())
}

/// GET /v1/credits
pub async fn get_credits(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let credits = state.ledger.balance(&identity.user_id).await?;
    Ok(Json(BalanceResponse {
        user_id: identity.user_id,
        credits,
    }))
}

/// POST /v1/generate
pub async fn post_generate(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<GenerationParams>, JsonRejection>,
) -> Result<Json<GenerateReceipt>, ApiError> {
    let Some(flow) = state.generate.as_ref() else {
        tracing::error!("generate requested but no generation API token is configured");
        return Err(ApiError::unavailable("image generation is not configured"));
    };
    let params = json_body(payload)?;
    let receipt = flow.generate(&identity, &params).await?;
    Ok(Json(receipt))
}

/// GET /v1/history?limit=
pub async fn get_history(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let records = state.history.list_history(&identity.user_id, limit).await?;
    Ok(Json(HistoryResponse {
        history: records.into_iter().map(HistoryEntry::from).collect(),
    }))
}

/// POST /v1/checkout
pub async fn post_checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutLink>, ApiError> {
    let Some(checkout) = state.checkout.as_ref() else {
        tracing::error!("checkout requested but no payment API key is configured");
        return Err(ApiError::unavailable("checkout is not configured"));
    };
    let request = json_body(payload)?;
    let link = checkout
        .create_session(&identity.user_id, request.amount)
        .await?;
    Ok(Json(link))
}

const CHECKOUT_SUCCESS_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Payment received</title></head>
<body>
<h1>Thank you!</h1>
<p>Your payment was received. Credits are added to your balance as soon as the payment provider confirms it.</p>
</body>
</html>
"#;

/// GET /checkout/success
pub async fn get_checkout_success() -> Html<&'static str> {
    Html(CHECKOUT_SUCCESS_PAGE)
}

/// GET /health
///
/// 200 while every adapter is healthy or degraded, 503 once one is unhealthy.
pub async fn get_health(State(state): State<AppState>) -> Response {
    let mut status = StatusCode::OK;
    let mut label = "ok";
    for adapter in &state.health.adapters {
        match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => {}
            Ok(HealthStatus::Degraded(reason)) => {
                tracing::warn!(adapter = adapter.name(), reason = %reason, "adapter degraded");
                if label == "ok" {
                    label = "degraded";
                }
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                tracing::error!(adapter = adapter.name(), reason = %reason, "adapter unhealthy");
                status = StatusCode::SERVICE_UNAVAILABLE;
                label = "unhealthy";
            }
            Err(e) => {
                tracing::error!(adapter = adapter.name(), error = %e, "health check failed");
                status = StatusCode::SERVICE_UNAVAILABLE;
                label = "unhealthy";
            }
        }
    }

    let body = HealthResponse {
        status: label.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    };
    (status, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            render(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "metrics are disabled".to_string(),
            }),
        )
            .into_response(),
    }
}
