//! Integration tests for the payment endpoints

use axum::{body::Body, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use checkout_bridge::middleware::auth::AuthConfig;
use checkout_bridge::payments::{InMemoryPaymentStore, PaymentStore, SignatureService};
use checkout_bridge::server::{build_router, AppState};
use checkout_bridge::services::{CheckoutSettings, NotificationService, PaymentService};
use http::{Request, StatusCode};
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

const SECRET: &str = "integration-secret-0123456789";
const PLATFORM_SECRET: &str = "platform-secret-0123456789";
const API_KEY: &str = "test-api-key";

struct TestApp {
    router: Router,
    store: Arc<InMemoryPaymentStore>,
}

fn build_app() -> TestApp {
    let store = Arc::new(InMemoryPaymentStore::new());
    let signer = SignatureService::new(SECRET).unwrap();
    let platform_signer = SignatureService::new(PLATFORM_SECRET).unwrap();
    let service = PaymentService::new(
        store.clone(),
        signer,
        NotificationService::disabled(platform_signer.clone()),
        CheckoutSettings {
            checkout_url: "https://pay.example.test/checkout".to_string(),
            default_currency: "USD".to_string(),
        },
    );
    let auth = AuthConfig {
        api_key: API_KEY.to_string(),
        platform_signer,
    };

    TestApp {
        router: build_router(AppState::new(service, auth)),
        store,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn redirect_body(order_id: &str, amount: Value) -> Value {
    json!({
        "orderId": order_id,
        "amount": amount,
        "currency": "USD",
        "callbackUrls": {
            "success": "https://shop.example.test/success",
            "failure": "https://shop.example.test/failure",
            "cancel": "https://shop.example.test/cancel"
        }
    })
}

fn card() -> Value {
    json!({ "number": "4242 4242 4242 4242", "expiry": "12/99", "cvv": "123" })
}

async fn redirect(app: &TestApp) -> String {
    let (status, body) = send(app, post("/api/redirect", redirect_body("o1", json!(10)))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["transactionId"].as_str().unwrap().to_string()
}

async fn create(app: &TestApp, payment_id: &str) -> (StatusCode, Value) {
    send(
        app,
        post(
            "/api/payments/create",
            json!({ "paymentId": payment_id, "cardDetails": card() }),
        ),
    )
    .await
}

fn signed_callback(payment_id: &str, status: &str, secret: &str) -> Request<Body> {
    let body = json!({ "paymentId": payment_id, "status": status }).to_string();
    let sig = SignatureService::new(secret).unwrap().sign_bytes(body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/api/callback")
        .header("content-type", "application/json")
        .header("x-signature", sig)
        .body(Body::from(body))
        .unwrap()
}

fn query_of(url: &str) -> HashMap<String, String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_redirect_creates_pending_payment_with_signed_url() {
    let app = build_app();

    let (status, body) = send(&app, post("/api/redirect", redirect_body("o1", json!(10)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    let payment_id = body["transactionId"].as_str().unwrap();
    assert!(payment_id.starts_with("pay_"));

    let redirect_url = body["redirectUrl"].as_str().unwrap();
    assert!(redirect_url.starts_with("https://pay.example.test/checkout?"));
    let query = query_of(redirect_url);
    assert_eq!(query["paymentId"], payment_id);
    assert_eq!(query["status"], "pending");
    assert_eq!(query["orderId"], "o1");
    assert_eq!(query["currency"], "USD");

    let signer = SignatureService::new(SECRET).unwrap();
    assert!(signer.verify_canonical(
        &json!({ "paymentId": payment_id, "status": "pending" }),
        &query["sig"]
    ));

    let record = app.store.get(payment_id).await.unwrap().unwrap();
    assert_eq!(record.order_id, "o1");
    assert_eq!(record.amount.to_string(), "10");
}

#[tokio::test]
async fn test_full_lifecycle_has_increasing_timestamps() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let (status, created) = create(&app, &payment_id).await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert_eq!(created["status"], "created");
    assert_eq!(created["card"]["last4"], "4242");
    assert_eq!(created["card"]["brand"], "visa");
    assert!(created.get("cardDetails").is_none());

    let (status, captured) = send(
        &app,
        post("/api/payments/capture", json!({ "paymentId": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", captured);
    assert_eq!(captured["status"], "captured");
    assert!(captured["captureId"].as_str().unwrap().starts_with("cap_"));

    let (status, refunded) = send(
        &app,
        post(
            "/api/payments/refund",
            json!({ "paymentId": payment_id, "reason": "customer request" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", refunded);
    assert_eq!(refunded["status"], "refunded");
    assert_eq!(refunded["reason"], "customer request");
    assert!(refunded["refundId"].as_str().unwrap().starts_with("ref_"));

    let t_create = timestamp(&created["timestamp"]);
    let t_capture = timestamp(&captured["timestamp"]);
    let t_refund = timestamp(&refunded["timestamp"]);
    assert!(t_create < t_capture);
    assert!(t_capture < t_refund);

    let (status, record) = send(&app, get(&format!("/api/payments/{}", payment_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "refunded");
    assert_eq!(record["card"]["last4"], "4242");
}

#[tokio::test]
async fn test_capture_before_create_is_rejected() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let (status, body) = send(
        &app,
        post("/api/payments/capture", json!({ "paymentId": payment_id })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");
    let record = app.store.get(&payment_id).await.unwrap().unwrap();
    assert_eq!(record.status.as_str(), "pending");
}

#[tokio::test]
async fn test_refund_requires_captured_payment() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let (status, _) = send(
        &app,
        post("/api/payments/refund", json!({ "paymentId": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post("/api/payments/cancel", json!({ "paymentId": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post("/api/payments/refund", json!({ "paymentId": payment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn test_cancel_rules() {
    let app = build_app();

    let pending = redirect(&app).await;
    let (status, body) = send(
        &app,
        post(
            "/api/payments/cancel",
            json!({ "paymentId": pending, "reason": "changed mind" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "canceled");
    assert!(body["cancellationId"].as_str().unwrap().starts_with("can_"));

    let captured = redirect(&app).await;
    create(&app, &captured).await;
    send(
        &app,
        post("/api/payments/capture", json!({ "paymentId": captured })),
    )
    .await;
    let (status, _) = send(
        &app,
        post("/api/payments/cancel", json!({ "paymentId": captured })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_amount_guards() {
    let app = build_app();
    let payment_id = redirect(&app).await;
    create(&app, &payment_id).await;

    let (status, body) = send(
        &app,
        post(
            "/api/payments/capture",
            json!({ "paymentId": payment_id, "amount": "10.01" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AMOUNT_EXCEEDED");

    let (status, _) = send(
        &app,
        post(
            "/api/payments/capture",
            json!({ "paymentId": payment_id, "amount": "6" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post(
            "/api/payments/refund",
            json!({ "paymentId": payment_id, "amount": "7" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AMOUNT_EXCEEDED");
}

#[tokio::test]
async fn test_unknown_payment_returns_404_and_leaves_store_untouched() {
    let app = build_app();
    redirect(&app).await;

    for uri in [
        "/api/payments/capture",
        "/api/payments/refund",
        "/api/payments/cancel",
    ] {
        let (status, body) = send(&app, post(uri, json!({ "paymentId": "pay_missing" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["code"], "PAYMENT_NOT_FOUND");
    }

    let (status, _) = create(&app, "pay_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/payments/pay_missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_card_is_rejected() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let (status, body) = send(
        &app,
        post(
            "/api/payments/create",
            json!({
                "paymentId": payment_id,
                "cardDetails": { "number": "4242424242424241", "expiry": "12/99", "cvv": "123" }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let record = app.store.get(&payment_id).await.unwrap().unwrap();
    assert!(record.card.is_none());
}

#[tokio::test]
async fn test_callback_success_sets_status_and_returns_signed_redirect() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let (status, body) = send(&app, signed_callback(&payment_id, "success", SECRET)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "callback_processed");
    let redirect_url = body["redirectUrl"].as_str().unwrap();
    assert!(redirect_url.starts_with("https://shop.example.test/success?"));
    let query = query_of(redirect_url);
    assert_eq!(query["status"], "success");
    assert!(SignatureService::new(SECRET).unwrap().verify_canonical(
        &json!({ "paymentId": payment_id, "status": "success" }),
        &query["sig"]
    ));

    let record = app.store.get(&payment_id).await.unwrap().unwrap();
    assert_eq!(record.status.as_str(), "success");
}

#[tokio::test]
async fn test_callback_routes_failed_and_canceled_to_their_urls() {
    let app = build_app();

    let failed = redirect(&app).await;
    let (_, body) = send(&app, signed_callback(&failed, "failed", SECRET)).await;
    assert!(body["redirectUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://shop.example.test/failure?"));

    let canceled = redirect(&app).await;
    let (_, body) = send(&app, signed_callback(&canceled, "canceled", SECRET)).await;
    assert!(body["redirectUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://shop.example.test/cancel?"));
}

#[tokio::test]
async fn test_forged_callback_is_rejected_without_mutation() {
    let app = build_app();
    let payment_id = redirect(&app).await;
    let before = app.store.get(&payment_id).await.unwrap().unwrap();

    let (status, body) = send(
        &app,
        signed_callback(&payment_id, "success", "wrong-secret-0123456789"),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INVALID_SIGNATURE");
    let after = app.store.get(&payment_id).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_callback_without_signature_is_unauthorized() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/callback")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "paymentId": payment_id, "status": "success" }).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_with_unknown_status_is_rejected() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let (status, body) = send(&app, signed_callback(&payment_id, "maybe", SECRET)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_api_key_is_required() {
    let app = build_app();

    let missing = Request::builder()
        .method("POST")
        .uri("/api/payments/capture")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "paymentId": "pay_1" }).to_string()))
        .unwrap();
    let (status, body) = send(&app, missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_REQUIRED");

    let wrong = Request::builder()
        .method("POST")
        .uri("/api/redirect")
        .header("content-type", "application/json")
        .header("x-api-key", "nope")
        .body(Body::from(redirect_body("o1", json!(10)).to_string()))
        .unwrap();
    let (status, body) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INVALID_API_KEY");
    assert_eq!(app.store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_redirect_accepts_platform_signature() {
    let app = build_app();
    let body = redirect_body("o-platform", json!("25.50")).to_string();
    let sig = SignatureService::new(PLATFORM_SECRET)
        .unwrap()
        .sign_bytes(body.as_bytes());
    let instance = STANDARD.encode(r#"{"instanceId":"inst-42"}"#);

    let request = Request::builder()
        .method("POST")
        .uri("/api/redirect")
        .header("content-type", "application/json")
        .header("x-wix-signature", sig)
        .header("x-wix-instance", instance.clone())
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, response) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK, "{}", response);
    let payment_id = response["transactionId"].as_str().unwrap();
    let record = app.store.get(payment_id).await.unwrap().unwrap();
    assert_eq!(record.platform_instance_id.as_deref(), Some("inst-42"));

    let forged = Request::builder()
        .method("POST")
        .uri("/api/redirect")
        .header("content-type", "application/json")
        .header("x-wix-signature", "00".repeat(32))
        .header("x-wix-instance", instance)
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(&app, forged).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_redirect_validation() {
    let app = build_app();

    let (status, _) = send(&app, post("/api/redirect", redirect_body("o1", json!(0)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post("/api/redirect", redirect_body("", json!(5)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_url = redirect_body("o1", json!(5));
    bad_url["callbackUrls"]["success"] = json!("ftp://shop.example.test/s");
    let (status, _) = send(&app, post("/api/redirect", bad_url)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let app = build_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/create")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_BODY");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = build_app();

    let request = Request::builder()
        .uri("/api/nowhere")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "ROUTE_NOT_FOUND");
}

#[tokio::test]
async fn test_health_and_root() {
    let app = build_app();
    redirect(&app).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["payments"], 1);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].as_array().unwrap().len() > 5);
}

#[tokio::test]
async fn test_callback_for_unknown_payment_returns_404() {
    let app = build_app();
    redirect(&app).await;

    let (status, body) = send(&app, signed_callback("pay_missing", "success", SECRET)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PAYMENT_NOT_FOUND");
    assert_eq!(app.store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_partial_refund_records_requested_amount() {
    let app = build_app();
    let payment_id = redirect(&app).await;
    create(&app, &payment_id).await;
    send(
        &app,
        post("/api/payments/capture", json!({ "paymentId": payment_id })),
    )
    .await;

    let (status, body) = send(
        &app,
        post(
            "/api/payments/refund",
            json!({ "paymentId": payment_id, "amount": "4.25" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], "4.25");
    let record = app.store.get(&payment_id).await.unwrap().unwrap();
    assert_eq!(record.refunded_amount.unwrap().to_string(), "4.25");
}

#[tokio::test]
async fn test_numeric_amount_keeps_decimal_precision() {
    let app = build_app();

    let (status, body) = send(&app, post("/api/redirect", redirect_body("o1", json!(19.99)))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let payment_id = body["transactionId"].as_str().unwrap().to_string();
    assert_eq!(query_of(body["redirectUrl"].as_str().unwrap())["amount"], "19.99");

    let record = app.store.get(&payment_id).await.unwrap().unwrap();
    assert_eq!(record.amount.to_string(), "19.99");

    create(&app, &payment_id).await;
    let (status, captured) = send(
        &app,
        post(
            "/api/payments/capture",
            json!({ "paymentId": payment_id, "amount": "19.99" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", captured);
    assert_eq!(captured["amount"], "19.99");

    let (status, refunded) = send(
        &app,
        post(
            "/api/payments/refund",
            json!({ "paymentId": payment_id, "amount": 19.99 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", refunded);
    assert_eq!(refunded["amount"], "19.99");

    let (_, view) = send(&app, get(&format!("/api/payments/{}", payment_id))).await;
    assert_eq!(view["amount"], "19.99");
    assert_eq!(view["refundedAmount"], "19.99");
}

#[tokio::test]
async fn test_error_body_carries_caller_request_id() {
    let app = build_app();

    let request = Request::builder()
        .uri("/api/payments/pay_missing")
        .header("x-api-key", API_KEY)
        .header("x-request-id", "abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["requestId"], "abc");
    assert_eq!(body["code"], "PAYMENT_NOT_FOUND");
}

#[tokio::test]
async fn test_error_body_carries_generated_request_id() {
    let app = build_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/cancel")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "paymentId": "pay_1" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let header_id = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["requestId"], header_id.as_str());
}

#[tokio::test]
async fn test_oversized_callback_body_returns_json_error() {
    let app = build_app();
    let payment_id = redirect(&app).await;

    let padding = "x".repeat(3 * 1024 * 1024);
    let body = json!({ "paymentId": payment_id, "status": "success", "pad": padding }).to_string();
    let sig = SignatureService::new(SECRET)
        .unwrap()
        .sign_bytes(body.as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/api/callback")
        .header("content-type", "application/json")
        .header("x-signature", sig)
        .body(Body::from(body))
        .unwrap();
    let (status, response) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "MALFORMED_BODY");
    let record = app.store.get(&payment_id).await.unwrap().unwrap();
    assert_eq!(record.status.as_str(), "pending");
}
