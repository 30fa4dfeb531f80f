// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pictura serve` command implementation.
//!
//! Wires storage, the credit ledger, the webhook processor, and the optional
//! checkout and generation backends into the gateway, then serves until
//! SIGINT or SIGTERM.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use pictura_config::PicturaConfig;
use pictura_core::{
    BalanceStore, HistoryStore, IdentityProvider, PicturaError, PluginAdapter, SessionLog,
};
use pictura_credits::{CreditLedger, GenerateFlow, Pricing};
use pictura_gateway::{AppState, HealthState};
use pictura_generation::PredictionClient;
use pictura_payment::{CheckoutClient, WebhookProcessor, WebhookVerifier};
use pictura_security::{RedactingWriter, SessionTokens};
use pictura_storage::SqliteStorage;

/// Runs the `pictura serve` command.
pub async fn run_serve(config: PicturaConfig) -> Result<(), PicturaError> {
    if let Err(errors) = pictura_config::validate_for_serve(&config) {
        pictura_config::render_errors(&errors);
        return Err(PicturaError::Config(
            "required secrets are missing".to_string(),
        ));
    }

    info!("starting pictura serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let pricing = Pricing::new(&config.credits, &config.payment.packages);
    let balances: Arc<dyn BalanceStore> = storage.clone();
    let ledger = Arc::new(CreditLedger::new(
        balances,
        config.credits.max_update_attempts,
    ));
    let history: Arc<dyn HistoryStore> = storage.clone();
    let sessions: Arc<dyn SessionLog> = storage.clone();

    let webhook_secret = required_secret(
        config.payment.webhook_secret.as_deref(),
        "payment.webhook_secret",
    )?;
    let verifier = WebhookVerifier::new(webhook_secret, config.payment.signature_tolerance_secs);
    let webhooks = Arc::new(
        WebhookProcessor::new(verifier, ledger.clone(), sessions, pricing.clone())
            .with_atomic_store(storage.clone()),
    );

    let checkout = match optional_secret(config.payment.api_key.as_deref()) {
        Some(key) => Some(Arc::new(CheckoutClient::new(
            &config.payment,
            key,
            pricing.clone(),
        )?)),
        None => {
            warn!("payment.api_key is not set; POST /v1/checkout will answer 503");
            None
        }
    };

    let storage_adapter: Arc<dyn PluginAdapter> = storage.clone();
    let mut adapters = vec![storage_adapter];
    let generate = match optional_secret(config.generation.api_token.as_deref()) {
        Some(token) => {
            let client = Arc::new(PredictionClient::new(&config.generation, token)?);
            info!(model = %client.model(), "generation backend configured");
            adapters.push(client.clone());
            Some(Arc::new(GenerateFlow::new(
                ledger.clone(),
                history.clone(),
                client,
                pricing,
            )))
        }
        None => {
            warn!("generation.api_token is not set; POST /v1/generate will answer 503");
            None
        }
    };

    let session_secret =
        required_secret(config.auth.session_secret.as_deref(), "auth.session_secret")?;
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(SessionTokens::new(session_secret, config.auth.token_ttl_secs));

    let prometheus_render = init_metrics(&config);

    let state = AppState {
        ledger,
        generate,
        webhooks,
        checkout,
        history,
        identity,
        starting_grant: config.credits.starting_grant,
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
            adapters,
        },
    };

    let cancel = install_signal_handler();
    let shutdown = {
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    };

    let served = pictura_gateway::start_server(&config.server, state, shutdown).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with an error");
    }

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    info!("pictura serve shutdown complete");
    served
}

fn optional_secret(value: Option<&str>) -> Option<SecretString> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| SecretString::from(v.to_string()))
}

fn required_secret(value: Option<&str>, key: &str) -> Result<SecretString, PicturaError> {
    optional_secret(value).ok_or_else(|| PicturaError::Config(format!("{key} is not set")))
}

#[cfg(feature = "prometheus")]
fn init_metrics(config: &PicturaConfig) -> Option<Arc<dyn Fn() -> String + Send + Sync>> {
    if !config.prometheus.enabled {
        debug!("prometheus metrics disabled");
        return None;
    }
    match pictura_prometheus::PrometheusAdapter::new() {
        Ok(adapter) => {
            let adapter = Arc::new(adapter);
            Some(Arc::new(move || adapter.render()))
        }
        Err(e) => {
            warn!(error = %e, "failed to install prometheus recorder; /metrics disabled");
            None
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics(_config: &PicturaConfig) -> Option<Arc<dyn Fn() -> String + Send + Sync>> {
    debug!("built without prometheus support");
    None
}

/// Returns a token cancelled on SIGINT (Ctrl+C) or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler; only Ctrl+C stops the server");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Configured secret values that must never reach the log output verbatim.
fn configured_secrets(config: &PicturaConfig) -> Vec<String> {
    [
        config.payment.api_key.as_deref(),
        config.payment.webhook_secret.as_deref(),
        config.generation.api_token.as_deref(),
        config.auth.session_secret.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_string)
    .collect()
}

/// Initializes the tracing subscriber, redacting secrets from every line.
pub fn init_tracing(config: &PicturaConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pictura={},warn", config.server.log_level)));

    let secrets = Arc::new(RwLock::new(Vec::new()));
    for secret in configured_secrets(config) {
        RedactingWriter::<std::io::Stderr>::add_secret(&secrets, secret);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_ansi(false)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), secrets.clone()))
        .init();
}
