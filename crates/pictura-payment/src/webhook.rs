// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook processing: one verified checkout completion becomes at most one
//! ledger credit.
//!
//! Per delivery: verify, filter on event type, check the processed-session
//! log, derive the delta from `amount_total`, apply it, then write the
//! witness. With an atomic store the last two steps share a transaction.
//! Deliveries for the same session are serialised in-process so a
//! concurrent duplicate observes the witness of the first.

use std::sync::Arc;

use dashmap::DashMap;
use strum::Display;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use pictura_core::{AtomicCreditStore, PicturaError, ProcessedSession, SessionLog, WitnessedCredit};
use pictura_credits::{CreditLedger, Pricing};

use crate::event::{CheckoutSession, WebhookEvent};
use crate::signature::WebhookVerifier;

/// Why a completed checkout was acknowledged without granting credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// `client_reference_id` absent or blank.
    MissingUser,
    /// `amount_total` absent.
    MissingAmount,
    /// `payment_status` is not `paid`.
    NotPaid,
    /// The amount converts to zero or fewer credits.
    NonPositiveDelta,
}

/// Result of a delivery that should be acknowledged with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied {
        session_id: String,
        user_id: String,
        credits: i64,
        new_balance: i64,
    },
    Duplicate {
        session_id: String,
    },
    Ignored {
        event_type: String,
    },
    Skipped {
        session_id: String,
        reason: SkipReason,
    },
}

impl WebhookOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Duplicate { .. } => "duplicate",
            Self::Ignored { .. } => "ignored",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Turns signed webhook deliveries into ledger credits.
pub struct WebhookProcessor {
    verifier: WebhookVerifier,
    ledger: Arc<CreditLedger>,
    sessions: Arc<dyn SessionLog>,
    pricing: Pricing,
    atomic: Option<Arc<dyn AtomicCreditStore>>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl WebhookProcessor {
    pub fn new(
        verifier: WebhookVerifier,
        ledger: Arc<CreditLedger>,
        sessions: Arc<dyn SessionLog>,
        pricing: Pricing,
    ) -> Self {
        Self {
            verifier,
            ledger,
            sessions,
            pricing,
            atomic: None,
            in_flight: DashMap::new(),
        }
    }

    /// Apply checkout credits and their witness in one transaction.
    ///
    /// `store` must hold the same balances and session log as the ledger and
    /// `sessions` passed to [`WebhookProcessor::new`].
    pub fn with_atomic_store(mut self, store: Arc<dyn AtomicCreditStore>) -> Self {
        self.atomic = Some(store);
        self
    }

    /// Handle one delivery of raw `payload` with its signature header.
    ///
    /// `SignatureInvalid` and `MalformedEvent` mean the request is rejected
    /// with 400. Any other error means credits were not applied and the
    /// provider should redeliver.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PicturaError> {
        let result = self.process(payload, signature).await;
        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(PicturaError::SignatureInvalid(_)) => "rejected",
            Err(PicturaError::MalformedEvent(_)) => "malformed",
            Err(_) => "error",
        };
        metrics::counter!("pictura_webhook_events_total", "outcome" => label).increment(1);
        result
    }

    async fn process(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PicturaError> {
        if let Err(e) = self.verifier.verify(payload, signature) {
            warn!(error = %e, "webhook rejected");
            return Err(e);
        }

        let event = WebhookEvent::parse(payload)?;
        if !event.is_checkout_completed() {
            info!(event_id = %event.id, event_type = %event.event_type, "ignoring unhandled event type");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let session = event.checkout_session()?;
        let lock = self
            .in_flight
            .entry(session.id.clone())
            .or_default()
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.apply_checkout(&event.id, &session).await
        };
        drop(lock);
        self.in_flight
            .remove_if(&session.id, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn apply_checkout(
        &self,
        event_id: &str,
        session: &CheckoutSession,
    ) -> Result<WebhookOutcome, PicturaError> {
        let session_id = session.id.as_str();

        if let Some(witness) = self.sessions.get_processed(session_id).await? {
            info!(
                session_id = %session_id,
                user_id = %witness.user_id,
                processed_at = %witness.processed_at,
                "duplicate delivery, credits already applied"
            );
            return Ok(WebhookOutcome::Duplicate {
                session_id: session_id.to_string(),
            });
        }

        let skip = |reason: SkipReason| WebhookOutcome::Skipped {
            session_id: session_id.to_string(),
            reason,
        };

        let Some(user_id) = session.user_id() else {
            error!(
                event_id = %event_id,
                session_id = %session_id,
                "completed checkout has no client_reference_id; no credits applied"
            );
            return Ok(skip(SkipReason::MissingUser));
        };
        let Some(amount) = session.amount_total else {
            error!(
                event_id = %event_id,
                session_id = %session_id,
                user_id = %user_id,
                "completed checkout has no amount_total; no credits applied"
            );
            return Ok(skip(SkipReason::MissingAmount));
        };
        if !session.is_paid() {
            warn!(
                session_id = %session_id,
                user_id = %user_id,
                payment_status = ?session.payment_status,
                "checkout completed without payment; no credits applied"
            );
            return Ok(skip(SkipReason::NotPaid));
        }

        let credits = self.pricing.credits_for_amount(amount)?;
        if credits <= 0 {
            warn!(
                session_id = %session_id,
                user_id = %user_id,
                amount,
                "amount converts to no credits; nothing applied"
            );
            return Ok(skip(SkipReason::NonPositiveDelta));
        }
        if let Some(promised) = session.promised_credits()
            && promised != credits
        {
            warn!(
                session_id = %session_id,
                promised,
                credits,
                "metadata credits disagree with amount_total; using amount_total"
            );
        }

        let witness = ProcessedSession {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            credits,
            processed_at: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        };
        let new_balance = match &self.atomic {
            Some(store) => match store.credit_with_witness(&witness).await? {
                WitnessedCredit::Applied { new_balance } => new_balance,
                WitnessedCredit::AlreadyProcessed => {
                    info!(
                        session_id = %session_id,
                        "witness written by a concurrent delivery; credits not applied again"
                    );
                    return Ok(WebhookOutcome::Duplicate {
                        session_id: session_id.to_string(),
                    });
                }
            },
            None => {
                let new_balance = self.ledger.apply_delta(user_id, credits).await?;
                self.record_witness(&witness, new_balance).await;
                new_balance
            }
        };
        metrics::counter!("pictura_credits_granted_total").increment(credits.unsigned_abs());

        info!(
            session_id = %session_id,
            user_id = %user_id,
            credits,
            new_balance,
            "checkout credits applied"
        );
        Ok(WebhookOutcome::Applied {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            credits,
            new_balance,
        })
    }

    /// Write the witness after the ledger applied its credits.
    ///
    /// An error here would make the provider redeliver and credit the session
    /// again, so failures raise a reconcile alarm and the delivery is still
    /// acknowledged.
    async fn record_witness(&self, witness: &ProcessedSession, new_balance: i64) {
        let problem = match self.sessions.record_processed(witness).await {
            Ok(true) => return,
            Ok(false) => "witness already present; session credited twice".to_string(),
            Err(e) => format!("witness not written: {e}"),
        };
        metrics::counter!("pictura_webhook_reconcile_required_total").increment(1);
        error!(
            session_id = %witness.session_id,
            user_id = %witness.user_id,
            credits = witness.credits,
            new_balance,
            problem = %problem,
            "credits applied but processed-session log disagrees; reconcile manually"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pictura_core::BalanceStore;
    use pictura_storage::SqliteStorage;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;
    use tracing_test::traced_test;

    const SECRET: &str = "whsec_processor_test";

    struct Fixture {
        processor: Arc<WebhookProcessor>,
        storage: Arc<SqliteStorage>,
        signer: WebhookVerifier,
        _dir: TempDir,
    }

    async fn fixture_with_log(log: Option<Arc<dyn SessionLog>>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(pictura_config::StorageConfig {
            database_path: dir.path().join("webhook.db").to_str().unwrap().to_string(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let storage = Arc::new(storage);
        storage.create_balance("user-1", 10).await.unwrap();

        let ledger = Arc::new(CreditLedger::new(storage.clone(), 5));
        let sessions: Arc<dyn SessionLog> = match log {
            Some(log) => log,
            None => storage.clone(),
        };
        let processor = WebhookProcessor::new(
            WebhookVerifier::new(SecretString::from(SECRET.to_string()), 300),
            ledger,
            sessions,
            Pricing::default(),
        );
        Fixture {
            processor: Arc::new(processor),
            storage,
            signer: WebhookVerifier::new(SecretString::from(SECRET.to_string()), 300),
            _dir: dir,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_log(None).await
    }

    fn checkout_event(session: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_test",
            "type": "checkout.session.completed",
            "data": { "object": session }
        }))
        .unwrap()
    }

    fn paid_session(session_id: &str, amount: i64) -> Vec<u8> {
        checkout_event(serde_json::json!({
            "id": session_id,
            "client_reference_id": "user-1",
            "amount_total": amount,
            "payment_status": "paid",
        }))
    }

    impl Fixture {
        fn sign(&self, payload: &[u8]) -> String {
            self.signer
                .sign(payload, chrono::Utc::now().timestamp())
                .unwrap()
        }

        async fn deliver(&self, payload: &[u8]) -> Result<WebhookOutcome, PicturaError> {
            let header = self.sign(payload);
            self.processor.handle(payload, Some(&header)).await
        }

        async fn credits(&self) -> i64 {
            self.storage
                .get_balance("user-1")
                .await
                .unwrap()
                .unwrap()
                .credits
        }
    }

    #[tokio::test]
    async fn paid_checkout_grants_credits_once() {
        let f = fixture().await;
        let payload = paid_session("cs_1", 500);

        let first = f.deliver(&payload).await.unwrap();
        assert_eq!(
            first,
            WebhookOutcome::Applied {
                session_id: "cs_1".to_string(),
                user_id: "user-1".to_string(),
                credits: 50,
                new_balance: 60,
            }
        );

        let replay = f.deliver(&payload).await.unwrap();
        assert_eq!(
            replay,
            WebhookOutcome::Duplicate {
                session_id: "cs_1".to_string()
            }
        );
        assert_eq!(f.credits().await, 60);

        let witness = f.storage.get_processed("cs_1").await.unwrap().unwrap();
        assert_eq!(witness.user_id, "user-1");
        assert_eq!(witness.credits, 50);
    }

    #[tokio::test]
    async fn concurrent_duplicates_apply_once() {
        let f = fixture().await;
        let payload = paid_session("cs_race", 1000);
        let header = f.sign(&payload);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let processor = f.processor.clone();
            let payload = payload.clone();
            let header = header.clone();
            tasks.push(tokio::spawn(async move {
                processor.handle(&payload, Some(&header)).await
            }));
        }
        let mut applied = 0;
        for task in tasks {
            if matches!(task.await.unwrap().unwrap(), WebhookOutcome::Applied { .. }) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(f.credits().await, 110);
        assert!(f.processor.in_flight.is_empty());
    }

    #[tokio::test]
    async fn bad_signature_changes_nothing() {
        let f = fixture().await;
        let payload = paid_session("cs_bad", 500);
        let err = f
            .processor
            .handle(&payload, Some("t=1,v1=00"))
            .await
            .unwrap_err();
        assert!(matches!(err, PicturaError::SignatureInvalid(_)));
        assert_eq!(f.credits().await, 10);
        assert_eq!(f.storage.get_processed("cs_bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unhandled_event_is_ignored_without_witness() {
        let f = fixture().await;
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_other",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "cs_other", "client_reference_id": "user-1", "amount_total": 500 } }
        }))
        .unwrap();

        let outcome = f.deliver(&payload).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "payment_intent.succeeded".to_string()
            }
        );
        assert_eq!(f.credits().await, 10);
        assert_eq!(f.storage.get_processed("cs_other").await.unwrap(), None);
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_reference_is_logged_and_skipped() {
        let f = fixture().await;
        // metadata.userId is deliberately not consulted.
        let payload = checkout_event(serde_json::json!({
            "id": "cs_nouser",
            "amount_total": 500,
            "payment_status": "paid",
            "metadata": { "userId": "user-1", "credits": "50" }
        }));
        let outcome = f.deliver(&payload).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Skipped {
                session_id: "cs_nouser".to_string(),
                reason: SkipReason::MissingUser
            }
        );
        assert_eq!(f.credits().await, 10);
        assert_eq!(f.storage.get_processed("cs_nouser").await.unwrap(), None);
        assert!(logs_contain("no client_reference_id"));
    }

    #[tokio::test]
    async fn missing_amount_unpaid_and_tiny_amounts_are_skipped() {
        let f = fixture().await;
        let cases = [
            (
                serde_json::json!({"id": "cs_a", "client_reference_id": "user-1", "payment_status": "paid"}),
                SkipReason::MissingAmount,
            ),
            (
                serde_json::json!({"id": "cs_b", "client_reference_id": "user-1", "amount_total": 500, "payment_status": "unpaid"}),
                SkipReason::NotPaid,
            ),
            (
                serde_json::json!({"id": "cs_c", "client_reference_id": "user-1", "amount_total": 5, "payment_status": "paid"}),
                SkipReason::NonPositiveDelta,
            ),
            (
                serde_json::json!({"id": "cs_d", "client_reference_id": "user-1", "amount_total": -500, "payment_status": "paid"}),
                SkipReason::NonPositiveDelta,
            ),
        ];
        for (session, expected) in cases {
            match f.deliver(&checkout_event(session)).await.unwrap() {
                WebhookOutcome::Skipped { reason, .. } => assert_eq!(reason, expected),
                other => panic!("expected skip, got {other:?}"),
            }
        }
        assert_eq!(f.credits().await, 10);
    }

    #[tokio::test]
    async fn unknown_user_is_an_error_for_redelivery() {
        let f = fixture().await;
        let payload = checkout_event(serde_json::json!({
            "id": "cs_ghost",
            "client_reference_id": "ghost",
            "amount_total": 500,
            "payment_status": "paid",
        }));
        let err = f.deliver(&payload).await.unwrap_err();
        assert!(matches!(err, PicturaError::NotFound { .. }));
        assert_eq!(f.storage.get_processed("cs_ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_verified_payload_is_rejected() {
        let f = fixture().await;
        let err = f.deliver(b"{\"not\":\"an event\"}").await.unwrap_err();
        assert!(matches!(err, PicturaError::MalformedEvent(_)));
    }

    /// Session log whose writes fail after a switch is flipped.
    struct BrokenWitnessLog {
        inner: Arc<SqliteStorage>,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl SessionLog for BrokenWitnessLog {
        async fn get_processed(
            &self,
            session_id: &str,
        ) -> Result<Option<ProcessedSession>, PicturaError> {
            self.inner.get_processed(session_id).await
        }

        async fn record_processed(&self, record: &ProcessedSession) -> Result<bool, PicturaError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PicturaError::Storage {
                    source: "disk full".into(),
                });
            }
            self.inner.record_processed(record).await
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn witness_failure_after_apply_still_acknowledges() {
        let base = fixture().await;
        let log = Arc::new(BrokenWitnessLog {
            inner: base.storage.clone(),
            fail_writes: AtomicBool::new(true),
        });
        let ledger = Arc::new(CreditLedger::new(base.storage.clone(), 5));
        let processor = WebhookProcessor::new(
            WebhookVerifier::new(SecretString::from(SECRET.to_string()), 300),
            ledger,
            log,
            Pricing::default(),
        );

        let payload = paid_session("cs_nowitness", 500);
        let header = base.sign(&payload);
        let outcome = processor.handle(&payload, Some(&header)).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Applied { credits: 50, .. }));
        assert_eq!(base.credits().await, 60);
        assert!(logs_contain("reconcile manually"));
    }

    /// Session log that never sees existing witnesses, like a lookup that
    /// raced another process's insert.
    struct StaleReadLog {
        inner: Arc<SqliteStorage>,
    }

    #[async_trait]
    impl SessionLog for StaleReadLog {
        async fn get_processed(
            &self,
            _session_id: &str,
        ) -> Result<Option<ProcessedSession>, PicturaError> {
            Ok(None)
        }

        async fn record_processed(&self, record: &ProcessedSession) -> Result<bool, PicturaError> {
            self.inner.record_processed(record).await
        }
    }

    impl Fixture {
        fn processor_with(&self, log: Arc<dyn SessionLog>, atomic: bool) -> WebhookProcessor {
            let ledger = Arc::new(CreditLedger::new(self.storage.clone(), 5));
            let processor = WebhookProcessor::new(
                WebhookVerifier::new(SecretString::from(SECRET.to_string()), 300),
                ledger,
                log,
                Pricing::default(),
            );
            if atomic {
                processor.with_atomic_store(self.storage.clone())
            } else {
                processor
            }
        }

        async fn record_foreign_witness(&self, session_id: &str) {
            let witness = ProcessedSession {
                session_id: session_id.to_string(),
                user_id: "user-1".to_string(),
                credits: 50,
                processed_at: "2026-01-01T00:00:00.000Z".to_string(),
            };
            assert!(self.storage.record_processed(&witness).await.unwrap());
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn witness_found_after_apply_raises_reconcile_alarm() {
        let f = fixture().await;
        f.record_foreign_witness("cs_late").await;
        let processor = f.processor_with(
            Arc::new(StaleReadLog {
                inner: f.storage.clone(),
            }),
            false,
        );

        let payload = paid_session("cs_late", 500);
        let outcome = processor
            .handle(&payload, Some(&f.sign(&payload)))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            WebhookOutcome::Applied {
                credits: 50,
                new_balance: 60,
                ..
            }
        ));
        assert!(logs_contain("ERROR"));
        assert!(logs_contain("session credited twice"));
        assert!(logs_contain("reconcile manually"));
    }

    #[tokio::test]
    async fn atomic_store_writes_balance_and_witness() {
        let f = fixture().await;
        let processor = f.processor_with(f.storage.clone(), true);

        let payload = paid_session("cs_tx", 500);
        let header = f.sign(&payload);
        let first = processor.handle(&payload, Some(&header)).await.unwrap();
        assert!(matches!(
            first,
            WebhookOutcome::Applied {
                new_balance: 60,
                ..
            }
        ));
        let replay = processor.handle(&payload, Some(&header)).await.unwrap();
        assert!(matches!(replay, WebhookOutcome::Duplicate { .. }));
        assert_eq!(f.credits().await, 60);
        assert_eq!(
            f.storage.get_processed("cs_tx").await.unwrap().unwrap().credits,
            50
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn atomic_store_refuses_session_witnessed_elsewhere() {
        let f = fixture().await;
        f.record_foreign_witness("cs_late").await;
        let processor = f.processor_with(
            Arc::new(StaleReadLog {
                inner: f.storage.clone(),
            }),
            true,
        );

        let payload = paid_session("cs_late", 500);
        let outcome = processor
            .handle(&payload, Some(&f.sign(&payload)))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Duplicate {
                session_id: "cs_late".to_string()
            }
        );
        assert_eq!(f.credits().await, 10);
        assert!(!logs_contain("reconcile manually"));
    }

    #[tokio::test]
    async fn atomic_store_unknown_user_writes_no_witness() {
        let f = fixture().await;
        let processor = f.processor_with(f.storage.clone(), true);
        let payload = checkout_event(serde_json::json!({
            "id": "cs_ghost",
            "client_reference_id": "ghost",
            "amount_total": 500,
            "payment_status": "paid",
        }));
        let err = processor
            .handle(&payload, Some(&f.sign(&payload)))
            .await
            .unwrap_err();
        assert!(matches!(err, PicturaError::NotFound { .. }));
        assert_eq!(f.storage.get_processed("cs_ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_failure_before_apply_is_an_error() {
        struct DownLog;

        #[async_trait]
        impl SessionLog for DownLog {
            async fn get_processed(
                &self,
                _session_id: &str,
            ) -> Result<Option<ProcessedSession>, PicturaError> {
                Err(PicturaError::Storage {
                    source: "connection refused".into(),
                })
            }

            async fn record_processed(
                &self,
                _record: &ProcessedSession,
            ) -> Result<bool, PicturaError> {
                unreachable!("never reached when lookups fail")
            }
        }

        let f = fixture_with_log(Some(Arc::new(DownLog))).await;
        let err = f.deliver(&paid_session("cs_down", 500)).await.unwrap_err();
        assert!(matches!(err, PicturaError::Storage { .. }));
        assert_eq!(f.credits().await, 10);
    }
}
