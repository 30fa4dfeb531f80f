// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests through the full HTTP router.
//!
//! Each test creates an isolated TestHarness with temp SQLite and a mock
//! generation backend. Tests are independent and order-insensitive.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pictura_core::SessionLog;
use pictura_test_utils::webhook::{CheckoutFixture, sign_payload, unrelated_event};
use pictura_test_utils::{MockBackend, TestHarness};

async fn registered(harness: &TestHarness, user_id: &str) -> String {
    let token = harness.token_for(user_id).unwrap();
    let response = harness
        .request(Method::POST, "/v1/account", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::CREATED);
    token
}

// ---- Accounts and identity ----

#[tokio::test]
async fn registering_twice_grants_once() {
    let harness = TestHarness::builder().build().await.unwrap();
    let token = registered(&harness, "alice").await;

    let again = harness
        .request(Method::POST, "/v1/account", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.json()["credits"], 10);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn credits_reports_balance_of_token_owner() {
    let harness = TestHarness::builder()
        .with_starting_grant(25)
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(Method::GET, "/v1/credits", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"user_id": "alice", "credits": 25}));
}

#[tokio::test]
async fn credits_without_account_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let token = harness.token_for("ghost").unwrap();
    let response = harness
        .request(Method::GET, "/v1/credits", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn client_routes_require_valid_token() {
    let harness = TestHarness::builder().build().await.unwrap();

    let missing = harness
        .request(Method::GET, "/v1/credits", None, None)
        .await
        .unwrap();
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let forged = harness
        .request(Method::GET, "/v1/credits", Some("v1.616c696365.9999999999.00"), None)
        .await
        .unwrap();
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.json()["error"], "invalid session token");
}

// ---- Payment webhook ----

#[tokio::test]
async fn paid_checkout_credits_the_referenced_user() {
    let harness = TestHarness::builder().build().await.unwrap();
    registered(&harness, "alice").await;

    let payload = CheckoutFixture::paid("cs_1", "alice", 500).payload();
    let response = harness.deliver_webhook(&payload).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"received": true}));
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(60));
}

#[tokio::test]
async fn redelivered_session_is_applied_once() {
    let harness = TestHarness::builder().build().await.unwrap();
    registered(&harness, "alice").await;
    let payload = CheckoutFixture::paid("cs_1", "alice", 1000).payload();

    for _ in 0..3 {
        let response = harness.deliver_webhook(&payload).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(110));
}

#[tokio::test]
async fn concurrent_deliveries_of_one_session_apply_once() {
    let harness = Arc::new(TestHarness::builder().build().await.unwrap());
    registered(&harness, "alice").await;
    let payload = CheckoutFixture::paid("cs_race", "alice", 500).payload();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let harness = harness.clone();
        let payload = payload.clone();
        tasks.push(tokio::spawn(async move {
            harness.deliver_webhook(&payload).await.unwrap().status
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(60));
}

#[tokio::test]
async fn distinct_sessions_for_one_user_accumulate() {
    let harness = Arc::new(TestHarness::builder().build().await.unwrap());
    registered(&harness, "alice").await;

    let mut tasks = Vec::new();
    for i in 0..4 {
        let harness = harness.clone();
        tasks.push(tokio::spawn(async move {
            let payload = CheckoutFixture::paid(&format!("cs_{i}"), "alice", 500).payload();
            harness.deliver_webhook(&payload).await.unwrap().status
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10 + 4 * 50));
}

#[tokio::test]
async fn bad_signature_is_rejected_without_credit() {
    let harness = TestHarness::builder().build().await.unwrap();
    registered(&harness, "alice").await;
    let payload = CheckoutFixture::paid("cs_1", "alice", 500).payload();

    let wrong_key = sign_payload("whsec_someone_else", &payload);
    let response = harness
        .deliver_webhook_with(&payload, Some(&wrong_key))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let unsigned = harness.deliver_webhook_with(&payload, None).await.unwrap();
    assert_eq!(unsigned.status, StatusCode::BAD_REQUEST);

    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn tampered_payload_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    registered(&harness, "alice").await;
    let payload = CheckoutFixture::paid("cs_1", "alice", 500).payload();
    let signature = sign_payload(pictura_test_utils::WEBHOOK_SECRET, &payload);

    let inflated = CheckoutFixture::paid("cs_1", "alice", 50_000).payload();
    let response = harness
        .deliver_webhook_with(&inflated, Some(&signature))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn verified_but_unparseable_payload_is_bad_request() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = harness.deliver_webhook(b"{not json").await.unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_event_types_are_acknowledged_and_ignored() {
    let harness = TestHarness::builder().build().await.unwrap();
    registered(&harness, "alice").await;
    let response = harness
        .deliver_webhook(&unrelated_event("payment_intent.succeeded"))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
    assert!(harness.storage.get_processed("pi_1").await.unwrap().is_none());
}

#[tokio::test]
async fn checkout_without_user_or_payment_grants_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    registered(&harness, "alice").await;

    let anonymous = CheckoutFixture {
        user_id: None,
        ..CheckoutFixture::paid("cs_anon", "alice", 500)
    };
    let unpaid = CheckoutFixture {
        payment_status: "unpaid",
        ..CheckoutFixture::paid("cs_unpaid", "alice", 500)
    };
    for fixture in [anonymous, unpaid] {
        let response = harness.deliver_webhook(&fixture.payload()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn unknown_user_fails_then_succeeds_on_redelivery() {
    let harness = TestHarness::builder().build().await.unwrap();
    let payload = CheckoutFixture::paid("cs_early", "bob", 500).payload();

    let first = harness.deliver_webhook(&payload).await.unwrap();
    assert_eq!(first.status, StatusCode::INTERNAL_SERVER_ERROR);

    registered(&harness, "bob").await;
    let retry = harness.deliver_webhook(&payload).await.unwrap();
    assert_eq!(retry.status, StatusCode::OK);
    assert_eq!(harness.balance_of("bob").await.unwrap(), Some(60));
}

#[tokio::test]
async fn unreachable_session_log_asks_for_redelivery() {
    let harness = TestHarness::builder()
        .with_unavailable_session_log()
        .build()
        .await
        .unwrap();
    registered(&harness, "alice").await;

    let payload = CheckoutFixture::paid("cs_1", "alice", 500).payload();
    let response = harness.deliver_webhook(&payload).await.unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn witness_write_failure_still_acknowledges() {
    let harness = TestHarness::builder()
        .with_failing_witness_writes()
        .build()
        .await
        .unwrap();
    registered(&harness, "alice").await;

    let payload = CheckoutFixture::paid("cs_1", "alice", 500).payload();
    let response = harness.deliver_webhook(&payload).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(60));
}

// ---- Generation ----

#[tokio::test]
async fn generate_charges_per_output_and_records_history() {
    let harness = TestHarness::builder().build().await.unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(
            Method::POST,
            "/v1/generate",
            Some(&token),
            Some(json!({"prompt": "a lighthouse at dusk", "num_outputs": 3, "output_format": "png"})),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["credits_charged"], 6);
    assert_eq!(body["credits_remaining"], 4);
    assert_eq!(body["images"].as_array().unwrap().len(), 3);
    assert_eq!(harness.backend.calls(), 1);

    let history = harness
        .request(Method::GET, "/v1/history", Some(&token), None)
        .await
        .unwrap();
    assert_eq!(history.status, StatusCode::OK);
    let entries = history.json()["history"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["prompt"], "a lighthouse at dusk");
    assert_eq!(entries[0]["credits_charged"], 6);
    assert_eq!(entries[0]["params"]["output_format"], "png");
}

#[tokio::test]
async fn unaffordable_generation_never_reaches_backend() {
    let harness = TestHarness::builder()
        .with_starting_grant(3)
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(
            Method::POST,
            "/v1/generate",
            Some(&token),
            Some(json!({"prompt": "two cats", "num_outputs": 2})),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        response.json()["error"],
        "Not enough credits. You need 4 credits for 2 output(s)."
    );
    assert_eq!(harness.backend.calls(), 0);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(3));
}

#[tokio::test]
async fn backend_failure_keeps_the_debit() {
    let harness = TestHarness::builder()
        .with_backend(MockBackend::failing("model offline"))
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(
            Method::POST,
            "/v1/generate",
            Some(&token),
            Some(json!({"prompt": "storm"})),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(8));
}

#[tokio::test]
async fn invalid_parameters_are_rejected_before_charging() {
    let harness = TestHarness::builder().build().await.unwrap();
    let token = registered(&harness, "alice").await;

    for body in [
        json!({"prompt": "x", "num_outputs": 5}),
        json!({"prompt": "   "}),
        json!({"prompt": "x", "aspect_ratio": "7:3"}),
        json!({"num_outputs": 1}),
    ] {
        let response = harness
            .request(Method::POST, "/v1/generate", Some(&token), Some(body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response.json()["error"].is_string(), "{body}");
    }
    assert_eq!(harness.backend.calls(), 0);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn history_failure_does_not_block_generation() {
    let harness = TestHarness::builder()
        .with_failing_history()
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(
            Method::POST,
            "/v1/generate",
            Some(&token),
            Some(json!({"prompt": "fog"})),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(harness.backend.calls(), 1);
}

#[tokio::test]
async fn generate_is_unavailable_without_backend() {
    let harness = TestHarness::builder()
        .without_generation()
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;
    let response = harness
        .request(
            Method::POST,
            "/v1/generate",
            Some(&token),
            Some(json!({"prompt": "x"})),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn history_limit_is_capped() {
    let harness = TestHarness::builder()
        .with_starting_grant(1000)
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;
    for i in 0..3 {
        let response = harness
            .request(
                Method::POST,
                "/v1/generate",
                Some(&token),
                Some(json!({"prompt": format!("prompt {i}")})),
            )
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    let limited = harness
        .request(Method::GET, "/v1/history?limit=2", Some(&token), None)
        .await
        .unwrap();
    let entries = limited.json()["history"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["prompt"], "prompt 2");

    let other = harness.token_for("bob").unwrap();
    let empty = harness
        .request(Method::GET, "/v1/history", Some(&other), None)
        .await
        .unwrap();
    assert_eq!(empty.json()["history"], json!([]));
}

// ---- Checkout ----

#[tokio::test]
async fn checkout_is_unavailable_without_api_key() {
    let harness = TestHarness::builder().build().await.unwrap();
    let token = registered(&harness, "alice").await;
    let response = harness
        .request(Method::POST, "/v1/checkout", Some(&token), Some(json!({"amount": 5})))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn checkout_returns_payment_link_without_granting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "url": "https://checkout.test/pay/cs_test_123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = TestHarness::builder()
        .with_checkout_api(server.uri())
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(Method::POST, "/v1/checkout", Some(&token), Some(json!({"amount": 5})))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"session_id": "cs_test_123", "url": "https://checkout.test/pay/cs_test_123"})
    );
    assert_eq!(harness.balance_of("alice").await.unwrap(), Some(10));
}

#[tokio::test]
async fn checkout_rejects_unlisted_package() {
    let server = MockServer::start().await;
    let harness = TestHarness::builder()
        .with_checkout_api(server.uri())
        .build()
        .await
        .unwrap();
    let token = registered(&harness, "alice").await;

    let response = harness
        .request(Method::POST, "/v1/checkout", Some(&token), Some(json!({"amount": 7})))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_success_page_is_public() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = harness
        .request(Method::GET, "/checkout/success", None, None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Thank you"));
}

// ---- Observability ----

#[tokio::test]
async fn metrics_are_not_found_when_disabled() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = harness
        .request(Method::GET, "/metrics", None, None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_render_when_enabled() {
    let harness = TestHarness::builder()
        .with_metrics_render(Arc::new(|| "pictura_webhook_events_total 0\n".to_string()))
        .build()
        .await
        .unwrap();
    let response = harness
        .request(Method::GET, "/metrics", None, None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("pictura_webhook_events_total"));
}

#[tokio::test]
async fn health_reports_version() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = harness
        .request(Method::GET, "/health", None, None)
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    assert!(body["uptime_secs"].is_u64());
}
