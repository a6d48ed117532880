//! Payment webhook processing against the in-memory marketplace.

#![allow(clippy::unwrap_used, clippy::panic)]

use futures::future::join_all;
use mentorlink_core::MarketplaceError;
use mentorlink_core::RemoteServiceError;
use mentorlink_core::ports::{BookingStore, Notification};
use mentorlink_core::types::{
    Booking, EnrollmentId, OrderStatus, OrderTarget, PaymentOrder, StudentId, WorkshopEnrollment, WorkshopId,
};
use mentorlink_runtime::MeetingOutcome;
use mentorlink_runtime::webhook::{ProvisionReport, WebhookOutcome};
use mentorlink_testing::fixtures::{self, monday};
use mentorlink_testing::{ScriptedProvisioner, TestMarketplace};

/// A pending paid booking and its order.
fn seed_pending(market: &TestMarketplace, external_order_id: &str) -> (Booking, PaymentOrder) {
    let mentor_id = market.mentor();
    let booking = fixtures::booking(mentor_id, monday(), "09:00 AM", 30);
    let order = fixtures::pending_order(external_order_id, OrderTarget::Booking(booking.id));
    market.store.add_booking(booking.clone());
    market.store.add_order(order.clone());
    (booking, order)
}

async fn deliver(market: &TestMarketplace, body: &[u8]) -> Result<WebhookOutcome, MarketplaceError> {
    market.webhooks().handle(body, Some(&market.sign(body))).await
}

#[tokio::test]
async fn test_captured_payment_completes_order_and_provisions() {
    let market = TestMarketplace::new();
    let (booking, order) = seed_pending(&market, "order_A");

    let outcome = deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();

    let WebhookOutcome::Applied {
        status, provisioning, ..
    } = outcome
    else {
        panic!("expected the order to move, got {outcome:?}");
    };
    assert_eq!(status, OrderStatus::Completed);
    assert!(matches!(provisioning, Some(ProvisionReport::Stored(MeetingOutcome::Created(_)))));

    let stored = market.store.get_order(order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.external_payment_id.as_deref(), Some("pay_A"));

    let booking = market.store.get_booking(booking.id).unwrap();
    assert!(booking.payment_status);
    assert_eq!(booking.meet_url.as_deref(), Some("https://meet.test/1"));

    let request = &market.provisioner.requests()[0];
    assert_eq!(request.start, fixtures::time("09:00 AM").on(monday()).and_utc());
    assert_eq!(request.duration_minutes, 30);
}

#[tokio::test]
async fn test_wrong_signature_reads_and_writes_nothing() {
    let market = TestMarketplace::new();
    let (booking, order) = seed_pending(&market, "order_A");
    let body = fixtures::captured_body("order_A", "pay_A");
    let forged = "0".repeat(64);

    for signature in [None, Some(forged.as_str()), Some("not-hex")] {
        let result = market.webhooks().handle(&body, signature).await;
        assert!(matches!(result, Err(MarketplaceError::Authentication(_))));
    }

    assert_eq!(market.store.read_count(), 0);
    assert_eq!(market.store.write_count(), 0);
    assert_eq!(market.store.get_order(order.id).unwrap().status, OrderStatus::Pending);
    assert!(!market.store.get_booking(booking.id).unwrap().payment_status);
}

#[tokio::test]
async fn test_signature_covers_the_exact_body() {
    let market = TestMarketplace::new();
    seed_pending(&market, "order_A");
    let body = fixtures::captured_body("order_A", "pay_A");
    let signature = market.sign(&body);

    let mut tampered = body.clone();
    tampered.push(b' ');
    let result = market.webhooks().handle(&tampered, Some(&signature)).await;
    assert!(matches!(result, Err(MarketplaceError::Authentication(_))));
}

#[tokio::test]
async fn test_duplicate_capture_keeps_one_meeting() {
    let market = TestMarketplace::new();
    let (booking, _) = seed_pending(&market, "order_A");
    let body = fixtures::captured_body("order_A", "pay_A");

    deliver(&market, &body).await.unwrap();
    let second = deliver(&market, &body).await.unwrap();

    assert!(matches!(second, WebhookOutcome::Duplicate { provisioning: None, .. }));
    assert_eq!(market.provisioner.call_count(), 1);
    assert_eq!(
        market.store.get_booking(booking.id).unwrap().meet_url.as_deref(),
        Some("https://meet.test/1")
    );
}

#[tokio::test]
async fn test_concurrent_duplicate_captures_store_one_url() {
    let provisioner = ScriptedProvisioner::new().with_delay(std::time::Duration::from_millis(20));
    let market = TestMarketplace::with_provisioner(provisioner);
    let (booking, order) = seed_pending(&market, "order_A");
    let body = fixtures::captured_body("order_A", "pay_A");
    let signature = market.sign(&body);

    let deliveries = (0..5).map(|_| {
        let processor = market.webhooks();
        let body = body.clone();
        let signature = signature.clone();
        tokio::spawn(async move { processor.handle(&body, Some(&signature)).await })
    });
    let outcomes: Vec<_> = join_all(deliveries).await.into_iter().map(|r| r.unwrap().unwrap()).collect();

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, WebhookOutcome::Applied { .. }))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(market.store.get_order(order.id).unwrap().status, OrderStatus::Completed);
    assert_eq!(market.provisioner.call_count(), 1);

    let stored = market.store.get_booking(booking.id).unwrap().meet_url.unwrap();
    let ready: Vec<_> = market
        .notifier
        .sent()
        .into_iter()
        .filter(|n| matches!(n, Notification::MeetingReady { .. }))
        .collect();
    assert_eq!(
        ready,
        vec![Notification::MeetingReady {
            booking_id: booking.id,
            meet_url: stored
        }]
    );
}

#[tokio::test]
async fn test_duplicate_capture_retries_a_missing_meeting() {
    let market = TestMarketplace::new();
    market
        .provisioner
        .push_error(RemoteServiceError::permanent("meet", "403 Forbidden"));
    let (booking, order) = seed_pending(&market, "order_A");
    let body = fixtures::captured_body("order_A", "pay_A");

    let first = deliver(&market, &body).await.unwrap();
    assert!(matches!(
        first,
        WebhookOutcome::Applied {
            provisioning: Some(ProvisionReport::Failed(MarketplaceError::RemoteService(_))),
            ..
        }
    ));
    // Payment stands even though the meeting failed.
    assert_eq!(market.store.get_order(order.id).unwrap().status, OrderStatus::Completed);
    assert!(market.store.get_booking(booking.id).unwrap().payment_status);
    assert!(market.store.get_booking(booking.id).unwrap().meet_url.is_none());

    let second = deliver(&market, &body).await.unwrap();
    assert!(matches!(
        second,
        WebhookOutcome::Duplicate {
            provisioning: Some(ProvisionReport::Stored(MeetingOutcome::Created(_))),
            ..
        }
    ));
    assert!(market.store.get_booking(booking.id).unwrap().meet_url.is_some());
}

#[tokio::test]
async fn test_duplicate_capture_leaves_a_held_lease_alone() {
    let market = TestMarketplace::new();
    let booking = fixtures::paid_booking(market.mentor(), monday(), "09:00 AM", 30);
    market.store.add_booking(booking.clone());
    market.store.add_order(fixtures::order_in(
        OrderStatus::Completed,
        "order_A",
        "pay_A",
        OrderTarget::Booking(booking.id),
    ));

    // Someone else is mid-call for this booking.
    let lease = chrono::TimeDelta::minutes(5);
    assert!(market.store.claim_provisioning(booking.id, fixtures::now(), lease).await.unwrap());

    let outcome = deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();
    assert!(matches!(
        outcome,
        WebhookOutcome::Duplicate {
            provisioning: Some(ProvisionReport::Stored(MeetingOutcome::InProgress)),
            ..
        }
    ));
    assert_eq!(market.provisioner.call_count(), 0);
    assert!(market.store.get_booking(booking.id).unwrap().meet_url.is_none());
}

#[tokio::test]
async fn test_retryable_provider_errors_are_retried() {
    let market = TestMarketplace::new();
    market.provisioner.fail_times(2);
    let (booking, _) = seed_pending(&market, "order_A");

    deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();

    assert_eq!(market.provisioner.call_count(), 3);
    assert!(market.store.get_booking(booking.id).unwrap().meet_url.is_some());
}

#[tokio::test]
async fn test_failure_after_capture_reverses_the_booking() {
    let market = TestMarketplace::new();
    let (booking, order) = seed_pending(&market, "order_A");

    deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();
    let outcome = deliver(&market, &fixtures::failed_body("order_A", "pay_A", "chargeback"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        WebhookOutcome::Applied {
            status: OrderStatus::Failed,
            ..
        }
    ));
    let booking = market.store.get_booking(booking.id).unwrap();
    assert!(!booking.payment_status);
    assert!(booking.meet_url.is_none());
    assert!(market.notifier.sent().contains(&Notification::PaymentFailed {
        order_id: order.id,
        target: OrderTarget::Booking(booking.id),
        reason: Some("chargeback".to_string()),
    }));
}

#[tokio::test]
async fn test_capture_after_failure_is_ignored() {
    let market = TestMarketplace::new();
    let (booking, order) = seed_pending(&market, "order_A");

    deliver(&market, &fixtures::failed_body("order_A", "pay_A", "declined")).await.unwrap();
    let outcome = deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();

    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    assert_eq!(market.store.get_order(order.id).unwrap().status, OrderStatus::Failed);
    assert!(!market.store.get_booking(booking.id).unwrap().payment_status);
    assert_eq!(market.provisioner.call_count(), 0);
}

#[tokio::test]
async fn test_refund_is_resolved_by_payment_id() {
    let market = TestMarketplace::new();
    let (booking, order) = seed_pending(&market, "order_A");

    deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();
    let outcome = deliver(&market, &fixtures::refund_body("pay_A", "rfnd_1")).await.unwrap();

    assert!(matches!(
        outcome,
        WebhookOutcome::Applied {
            status: OrderStatus::Refunded,
            ..
        }
    ));
    assert_eq!(market.store.get_order(order.id).unwrap().status, OrderStatus::Refunded);
    let booking = market.store.get_booking(booking.id).unwrap();
    assert!(!booking.payment_status);
    assert!(booking.meet_url.is_none());
    assert!(market.notifier.sent().contains(&Notification::PaymentRefunded {
        order_id: order.id,
        target: OrderTarget::Booking(booking.id),
    }));

    let again = deliver(&market, &fixtures::refund_body("pay_A", "rfnd_1")).await.unwrap();
    assert!(matches!(again, WebhookOutcome::Duplicate { .. }));
}

#[tokio::test]
async fn test_enrollment_capture_sets_payment_without_meeting() {
    let market = TestMarketplace::new();
    let enrollment = WorkshopEnrollment {
        id: EnrollmentId::new(),
        workshop_id: WorkshopId::new(),
        student_id: StudentId::new(),
        student_email: "ada@students.test".to_string(),
        payment_status: false,
    };
    market.store.add_enrollment(enrollment.clone());
    market
        .store
        .add_order(fixtures::pending_order("order_W", OrderTarget::Enrollment(enrollment.id)));

    let outcome = deliver(&market, &fixtures::captured_body("order_W", "pay_W")).await.unwrap();

    assert!(matches!(outcome, WebhookOutcome::Applied { provisioning: None, .. }));
    assert!(market.store.get_enrollment(enrollment.id).unwrap().payment_status);
    assert_eq!(market.provisioner.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_order_is_acknowledged() {
    let market = TestMarketplace::new();
    let outcome = deliver(&market, &fixtures::captured_body("order_missing", "pay_X")).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::Unmatched);
    assert_eq!(market.store.write_count(), 0);
}

#[tokio::test]
async fn test_order_with_missing_target_is_not_found() {
    let market = TestMarketplace::new();
    let (booking, _) = seed_pending(&market, "order_A");
    market.store.remove_booking(booking.id);

    let result = deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await;
    assert!(matches!(result, Err(MarketplaceError::NotFound { .. })));
}

#[tokio::test]
async fn test_unsupported_event_is_ignored() {
    let market = TestMarketplace::new();
    let body = br#"{"event":"order.paid","payload":{}}"#;
    let outcome = deliver(&market, body).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    assert_eq!(market.store.read_count(), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_a_validation_error() {
    let market = TestMarketplace::new();
    let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_A"}}}}"#;
    let result = deliver(&market, body).await;
    assert!(matches!(result, Err(MarketplaceError::Validation(_))));
}

#[tokio::test]
async fn test_order_already_completed_elsewhere_is_a_duplicate() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let mut booking = fixtures::paid_booking(mentor_id, monday(), "09:00 AM", 30);
    booking.meet_url = Some("https://meet.test/existing".to_string());
    market.store.add_booking(booking.clone());
    market.store.add_order(fixtures::order_in(
        OrderStatus::Completed,
        "order_A",
        "pay_A",
        OrderTarget::Booking(booking.id),
    ));

    let outcome = deliver(&market, &fixtures::captured_body("order_A", "pay_A")).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Duplicate { provisioning: None, .. }));
    assert_eq!(market.provisioner.call_count(), 0);
}
