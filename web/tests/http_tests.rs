//! HTTP surface against the in-memory marketplace.

#![allow(clippy::unwrap_used)]

use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use mentorlink_core::types::{OrderStatus, OrderTarget};
use mentorlink_runtime::metrics::detached_handle;
use mentorlink_testing::fixtures::{self, booking_request, free_request, monday};
use mentorlink_testing::TestMarketplace;
use mentorlink_web::{router, AppState};
use serde_json::{json, Value};

fn server(market: &TestMarketplace) -> TestServer {
    let state = AppState::new(
        market.coordinator(),
        market.webhooks(),
        market.store.clone(),
        detached_handle().unwrap(),
    );
    TestServer::new(router(state)).unwrap()
}

fn signature(value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-razorpay-signature"),
        HeaderValue::from_str(value).unwrap(),
    )
}

async fn post_webhook(server: &TestServer, body: Vec<u8>, sig: Option<&str>) -> axum_test::TestResponse {
    let mut request = server
        .post("/webhooks/payments")
        .content_type("application/json")
        .bytes(Bytes::from(body));
    if let Some(sig) = sig {
        let (name, value) = signature(sig);
        request = request.add_header(name, value);
    }
    request.await
}

#[tokio::test]
async fn test_health_and_readiness() {
    let market = TestMarketplace::new();
    let server = server(&market);

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.text(), "ok");

    let ready = server.get("/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["database"], json!(true));

    market.store.set_unavailable(true);
    let ready = server.get("/ready").await;
    ready.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready.json::<Value>()["status"], json!("unavailable"));
}

#[tokio::test]
async fn test_metrics_endpoint_answers() {
    let market = TestMarketplace::new();
    server(&market).get("/metrics").await.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let market = TestMarketplace::new();
    let server = server(&market);

    let response = server
        .get("/health")
        .add_header(HeaderName::from_static("x-request-id"), HeaderValue::from_static("req-42"))
        .await;
    assert_eq!(response.header("x-request-id"), "req-42");

    let response = server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
}

#[tokio::test]
async fn test_paid_booking_returns_order_handle() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let server = server(&market);

    let response = server
        .post("/api/bookings")
        .json(&booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["external_order_id"], json!("order_A"));
    assert!(body["order_id"].is_string());
    assert!(body["booking_id"].is_string());
    assert_eq!(market.store.orders().len(), 1);
}

#[tokio::test]
async fn test_held_slot_is_a_conflict() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let server = server(&market);

    server
        .post("/api/bookings")
        .json(&booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/bookings")
        .json(&booking_request(mentor_id, monday(), "09:15 AM", "order_B"))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], json!("CONFLICT"));
}

#[tokio::test]
async fn test_reused_order_id_is_not_a_server_error() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let server = server(&market);

    server
        .post("/api/bookings")
        .json(&booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/bookings")
        .json(&booking_request(mentor_id, monday(), "02:00 PM", "order_A"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_free_booking_returns_meeting() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();

    let response = server(&market)
        .post("/api/bookings")
        .json(&free_request(mentor_id, monday(), "02:00 PM"))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["meet_url"], json!("https://meet.test/1"));
}

#[tokio::test]
async fn test_invalid_bookings_are_unprocessable() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let server = server(&market);

    let mut bad_email = booking_request(mentor_id, monday(), "09:00 AM", "order_A");
    bad_email.contact.email = "not-an-email".into();
    let response = server.post("/api/bookings").json(&bad_email).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], json!("VALIDATION_ERROR"));

    let tuesday = monday() + chrono::TimeDelta::days(1);
    let response = server
        .post("/api/bookings")
        .json(&booking_request(mentor_id, tuesday, "09:00 AM", "order_B"))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], json!("NO_AVAILABILITY"));

    assert_eq!(market.store.write_count(), 0);
}

#[tokio::test]
async fn test_storage_failure_hides_details() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    market.store.set_unavailable(true);

    let response = server(&market)
        .post("/api/bookings")
        .json(&booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["message"], json!("An internal error occurred"));
}

#[tokio::test]
async fn test_slots_listing() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    market
        .store
        .add_booking(fixtures::paid_booking(mentor_id, monday(), "09:30 AM", 30));

    let response = server(&market)
        .get(&format!("/api/mentors/{mentor_id}/slots?date=2025-06-02&duration=60"))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["date"], json!("2025-06-02"));
    assert_eq!(
        body["slots"],
        json!(["10:00 AM", "11:00 AM", "02:00 PM", "03:00 PM", "04:00 PM"])
    );
}

#[tokio::test]
async fn test_slots_default_to_half_hour() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();

    let response = server(&market)
        .get(&format!("/api/mentors/{mentor_id}/slots?date=2025-06-02"))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["slots"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_captured_webhook_is_acknowledged() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let booking = fixtures::booking(mentor_id, monday(), "09:00 AM", 30);
    let order = fixtures::pending_order("order_A", OrderTarget::Booking(booking.id));
    market.store.add_booking(booking.clone());
    market.store.add_order(order.clone());

    let body = fixtures::captured_body("order_A", "pay_A");
    let sig = market.sign(&body);
    let response = post_webhook(&server(&market), body, Some(&sig)).await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"received": true}));
    assert_eq!(market.store.get_order(order.id).unwrap().status, OrderStatus::Completed);
    assert!(market.store.get_booking(booking.id).unwrap().meet_url.is_some());
}

#[tokio::test]
async fn test_bad_signature_is_rejected_without_touching_the_store() {
    let market = TestMarketplace::new();
    let server = server(&market);
    let body = fixtures::captured_body("order_A", "pay_A");

    for sig in [None, Some("deadbeef"), Some("not hex")] {
        let response = post_webhook(&server, body.clone(), sig).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], json!("INVALID_SIGNATURE"));
    }

    assert_eq!(market.store.read_count(), 0);
    assert_eq!(market.store.write_count(), 0);
}

#[tokio::test]
async fn test_malformed_webhook_is_a_bad_request() {
    let market = TestMarketplace::new();
    let body = br#"{"event":"payment.captured","payload":{}}"#.to_vec();
    let sig = market.sign(&body);

    let response = post_webhook(&server(&market), body, Some(&sig)).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_for_missing_booking_is_not_found() {
    let market = TestMarketplace::new();
    let orphan = fixtures::booking(market.mentor(), monday(), "09:00 AM", 30);
    market
        .store
        .add_order(fixtures::pending_order("order_A", OrderTarget::Booking(orphan.id)));

    let body = fixtures::captured_body("order_A", "pay_A");
    let sig = market.sign(&body);
    let response = post_webhook(&server(&market), body, Some(&sig)).await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_webhook_is_acknowledged() {
    let market = TestMarketplace::new();
    let body = fixtures::captured_body("order_unknown", "pay_X");
    let sig = market.sign(&body);

    post_webhook(&server(&market), body, Some(&sig)).await.assert_status_ok();
}
