// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pictura_config::ServerConfig;
use pictura_core::{HistoryStore, IdentityProvider, PicturaError, PluginAdapter};
use pictura_credits::{CreditLedger, GenerateFlow};
use pictura_payment::{CheckoutClient, WebhookProcessor};

use crate::auth::auth_middleware;
use crate::handlers;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Prometheus text renderer. `None` when metrics are disabled.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Adapters whose health checks feed `/health`.
    pub adapters: Vec<Arc<dyn PluginAdapter>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedger>,
    /// `None` when no generation API token is configured.
    pub generate: Option<Arc<GenerateFlow>>,
    pub webhooks: Arc<WebhookProcessor>,
    /// `None` when no payment API key is configured.
    pub checkout: Option<Arc<CheckoutClient>>,
    pub history: Arc<dyn HistoryStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Credits granted when an account is opened.
    pub starting_grant: i64,
    pub health: HealthState,
}

/// Build the full application router.
///
/// - `POST /webhook` (signature-verified)
/// - `POST /v1/account`, `GET /v1/credits`, `POST /v1/generate`,
///   `GET /v1/history`, `POST /v1/checkout` (bearer auth)
/// - `GET /checkout/success`, `GET /health`, `GET /metrics` (public)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route("/checkout/success", get(handlers::get_checkout_success))
        .route("/webhook", post(handlers::post_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/account", post(handlers::post_account))
        .route("/v1/credits", get(handlers::get_credits))
        .route("/v1/generate", post(handlers::post_generate))
        .route("/v1/history", get(handlers::get_history))
        .route("/v1/checkout", post(handlers::post_checkout))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind to `host:port` and serve until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), PicturaError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PicturaError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| PicturaError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
