// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete gateway with a mock generation
//! backend and a temp SQLite database, and drives it in-process through
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use tower::ServiceExt;

use pictura_config::PicturaConfig;
use pictura_core::{
    BalanceStore, HistoryStore, IdentityProvider, PicturaError, PluginAdapter, SessionLog,
};
use pictura_credits::{CreditLedger, GenerateFlow, Pricing};
use pictura_gateway::{AppState, HealthState, build_router};
use pictura_payment::{CheckoutClient, SIGNATURE_HEADER, WebhookProcessor, WebhookVerifier};
use pictura_security::SessionTokens;
use pictura_storage::SqliteStorage;

use crate::faulty::{FailingHistory, UnavailableSessionLog, WriteFailingSessionLog};
use crate::mock_backend::MockBackend;
use crate::webhook::sign_payload;

/// Webhook signing secret the harness verifies against.
pub const WEBHOOK_SECRET: &str = "whsec_harness_secret";
/// Session-token key the harness issues and verifies with.
pub const SESSION_SECRET: &str = "harness-session-secret";

#[derive(Clone, Copy, PartialEq, Eq)]
enum SessionLogMode {
    Normal,
    WriteFails,
    Unavailable,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: Option<MockBackend>,
    generation: bool,
    checkout_base_url: Option<String>,
    session_log: SessionLogMode,
    failing_history: bool,
    starting_grant: Option<i64>,
    metrics_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: None,
            generation: true,
            checkout_base_url: None,
            session_log: SessionLogMode::Normal,
            failing_history: false,
            starting_grant: None,
            metrics_render: None,
        }
    }

    /// Use `backend` for generation instead of a default [`MockBackend`].
    pub fn with_backend(mut self, backend: MockBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Leave generation unconfigured, as when no API token is set.
    pub fn without_generation(mut self) -> Self {
        self.generation = false;
        self
    }

    /// Point the checkout client at a mock payment API.
    pub fn with_checkout_api(mut self, base_url: impl Into<String>) -> Self {
        self.checkout_base_url = Some(base_url.into());
        self
    }

    /// Processed-session writes fail after credits are applied.
    pub fn with_failing_witness_writes(mut self) -> Self {
        self.session_log = SessionLogMode::WriteFails;
        self
    }

    /// The processed-session log cannot be reached at all.
    pub fn with_unavailable_session_log(mut self) -> Self {
        self.session_log = SessionLogMode::Unavailable;
        self
    }

    /// Prompt-history writes made by the generate flow fail.
    pub fn with_failing_history(mut self) -> Self {
        self.failing_history = true;
        self
    }

    pub fn with_starting_grant(mut self, credits: i64) -> Self {
        self.starting_grant = Some(credits);
        self
    }

    /// Serve `/metrics` from `render`.
    pub fn with_metrics_render(mut self, render: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.metrics_render = Some(render);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, PicturaError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| PicturaError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = PicturaConfig::default();
        config.storage.database_path = db_path.to_string_lossy().to_string();
        config.payment.webhook_secret = Some(WEBHOOK_SECRET.to_string());
        config.auth.session_secret = Some(SESSION_SECRET.to_string());
        if let Some(grant) = self.starting_grant {
            config.credits.starting_grant = grant;
        }
        if let Some(base_url) = &self.checkout_base_url {
            config.payment.api_base_url = base_url.clone();
            config.payment.api_key = Some("sk_test_harness".to_string());
        }

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let pricing = Pricing::new(&config.credits, &config.payment.packages);
        let balances: Arc<dyn BalanceStore> = storage.clone();
        let ledger = Arc::new(CreditLedger::new(
            balances,
            config.credits.max_update_attempts,
        ));

        let history: Arc<dyn HistoryStore> = storage.clone();
        let backend = Arc::new(self.backend.unwrap_or_default());
        let generate = self.generation.then(|| {
            let flow_history: Arc<dyn HistoryStore> = if self.failing_history {
                Arc::new(FailingHistory)
            } else {
                history.clone()
            };
            Arc::new(GenerateFlow::new(
                ledger.clone(),
                flow_history,
                backend.clone(),
                pricing.clone(),
            ))
        });

        let atomic_witness = matches!(self.session_log, SessionLogMode::Normal);
        let sessions: Arc<dyn SessionLog> = match self.session_log {
            SessionLogMode::Normal => storage.clone(),
            SessionLogMode::WriteFails => Arc::new(WriteFailingSessionLog::new(storage.clone())),
            SessionLogMode::Unavailable => Arc::new(UnavailableSessionLog),
        };
        let verifier = WebhookVerifier::new(
            SecretString::from(WEBHOOK_SECRET.to_string()),
            config.payment.signature_tolerance_secs,
        );
        let mut webhooks =
            WebhookProcessor::new(verifier, ledger.clone(), sessions, pricing.clone());
        // Fault-injected session logs only take effect on the two-step path.
        if atomic_witness {
            webhooks = webhooks.with_atomic_store(storage.clone());
        }
        let webhooks = Arc::new(webhooks);

        let checkout = match &config.payment.api_key {
            Some(key) => Some(Arc::new(CheckoutClient::new(
                &config.payment,
                SecretString::from(key.to_string()),
                pricing,
            )?)),
            None => None,
        };

        let tokens = Arc::new(SessionTokens::new(
            SecretString::from(SESSION_SECRET.to_string()),
            config.auth.token_ttl_secs,
        ));
        let identity: Arc<dyn IdentityProvider> = tokens.clone();
        let storage_adapter: Arc<dyn PluginAdapter> = storage.clone();

        let state = AppState {
            ledger: ledger.clone(),
            generate,
            webhooks,
            checkout,
            history,
            identity,
            starting_grant: config.credits.starting_grant,
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: self.metrics_render,
                adapters: vec![storage_adapter],
            },
        };

        Ok(TestHarness {
            storage,
            ledger,
            backend,
            tokens,
            config,
            state,
            _temp_dir: temp_dir,
        })
    }
}

/// Status and raw body of one in-process request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Body parsed as JSON, or `Null` if it is not JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A complete gateway on temp storage.
pub struct TestHarness {
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub ledger: Arc<CreditLedger>,
    /// The mock generation backend.
    pub backend: Arc<MockBackend>,
    pub tokens: Arc<SessionTokens>,
    pub config: PicturaConfig,
    pub state: AppState,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Issue a session token for `user_id`.
    pub fn token_for(&self, user_id: &str) -> Result<String, PicturaError> {
        self.tokens.issue(user_id)
    }

    /// Current stored balance, `None` if the user has no account.
    pub async fn balance_of(&self, user_id: &str) -> Result<Option<i64>, PicturaError> {
        Ok(self
            .storage
            .get_balance(user_id)
            .await?
            .map(|snapshot| snapshot.credits))
    }

    /// Send one request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Result<TestResponse, PicturaError> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .map_err(|e| PicturaError::Internal(format!("bad test request: {e}")))?;
        self.send(request).await
    }

    /// Deliver `payload` to `/webhook` with a valid signature.
    pub async fn deliver_webhook(&self, payload: &[u8]) -> Result<TestResponse, PicturaError> {
        let signature = sign_payload(WEBHOOK_SECRET, payload);
        self.deliver_webhook_with(payload, Some(&signature)).await
    }

    /// Deliver `payload` to `/webhook` with the given signature header, if any.
    pub async fn deliver_webhook_with(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<TestResponse, PicturaError> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        let request = builder
            .body(Body::from(payload.to_vec()))
            .map_err(|e| PicturaError::Internal(format!("bad test request: {e}")))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Result<TestResponse, PicturaError> {
        let response = self
            .router()
            .oneshot(request)
            .await
            .map_err(|e| PicturaError::Internal(format!("router error: {e}")))?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| PicturaError::Internal(format!("failed to read body: {e}")))?;
        Ok(TestResponse {
            status,
            body: body.to_vec(),
        })
    }
}
