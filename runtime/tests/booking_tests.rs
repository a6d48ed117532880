//! Booking coordinator against the in-memory marketplace.

#![allow(clippy::unwrap_used, clippy::panic)]

use futures::future::join_all;
use mentorlink_core::types::{MentorId, OrderStatus, OrderTarget};
use mentorlink_core::{MarketplaceError, RemoteServiceError};
use mentorlink_core::ports::Notification;
use mentorlink_runtime::BookingOutcome;
use mentorlink_testing::fixtures::{self, booking_request, free_request, monday};
use mentorlink_testing::TestMarketplace;

#[tokio::test]
async fn test_paid_request_creates_pending_booking_and_order() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();

    let outcome = market
        .coordinator()
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .unwrap();

    let BookingOutcome::AwaitingPayment(handle) = outcome else {
        panic!("expected a pending order, got {outcome:?}");
    };
    assert_eq!(handle.external_order_id, "order_A");

    let booking = market.store.get_booking(handle.booking_id).unwrap();
    assert!(!booking.payment_status);
    assert!(booking.meet_url.is_none());

    let order = market.store.get_order(handle.order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.target, OrderTarget::Booking(handle.booking_id));
    assert_eq!(market.provisioner.call_count(), 0);
}

#[tokio::test]
async fn test_overlapping_request_is_a_conflict() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let coordinator = market.coordinator();

    coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .unwrap();
    let second = coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:15 AM", "order_B"))
        .await;

    assert!(matches!(second, Err(MarketplaceError::Conflict { .. })));
    assert_eq!(market.store.bookings().len(), 1);
}

#[tokio::test]
async fn test_reused_gateway_order_is_rejected() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let coordinator = market.coordinator();

    coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .unwrap();
    let second = coordinator
        .request_booking(booking_request(mentor_id, monday(), "02:00 PM", "order_A"))
        .await;

    assert!(matches!(second, Err(MarketplaceError::Validation(_))));
    assert_eq!(market.store.bookings().len(), 1);
    assert_eq!(market.store.orders().len(), 1);
}

#[tokio::test]
async fn test_back_to_back_sessions_do_not_conflict() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let coordinator = market.coordinator();

    coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .unwrap();
    coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:30 AM", "order_B"))
        .await
        .unwrap();

    assert_eq!(market.store.bookings().len(), 2);
}

#[tokio::test]
async fn test_other_mentors_calendars_are_independent() {
    let market = TestMarketplace::new();
    let first = market.mentor();
    let second = market.mentor();
    let coordinator = market.coordinator();

    coordinator
        .request_booking(booking_request(first, monday(), "09:00 AM", "order_A"))
        .await
        .unwrap();
    coordinator
        .request_booking(booking_request(second, monday(), "09:00 AM", "order_B"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_for_one_slot_admit_exactly_one() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let coordinator = market.coordinator();

    let attempts = (0..8).map(|i| {
        let coordinator = coordinator.clone();
        let request = booking_request(mentor_id, monday(), "10:00 AM", &format!("order_{i}"));
        tokio::spawn(async move { coordinator.request_booking(request).await })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(Result::unwrap).collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(MarketplaceError::Conflict { .. })))
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(market.store.bookings().len(), 1);
    assert_eq!(market.store.orders().len(), 1);
}

#[tokio::test]
async fn test_failed_payment_releases_the_slot() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let coordinator = market.coordinator();

    coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await
        .unwrap();

    let body = fixtures::failed_body("order_A", "pay_A", "card declined");
    market.webhooks().handle(&body, Some(&market.sign(&body))).await.unwrap();

    coordinator
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_B"))
        .await
        .unwrap();
    assert_eq!(market.store.bookings().len(), 2);
}

#[tokio::test]
async fn test_free_session_is_confirmed_with_a_meeting() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();

    let outcome = market
        .coordinator()
        .request_booking(free_request(mentor_id, monday(), "02:00 PM"))
        .await
        .unwrap();

    let BookingOutcome::Confirmed { booking_id, meet_url } = outcome else {
        panic!("expected a confirmed booking, got {outcome:?}");
    };
    let meet_url = meet_url.unwrap();
    let booking = market.store.get_booking(booking_id).unwrap();
    assert!(booking.payment_status);
    assert!(booking.is_free_session);
    assert_eq!(booking.meet_url.as_deref(), Some(meet_url.as_str()));
    assert!(market.store.orders().is_empty());

    let request = &market.provisioner.requests()[0];
    assert!(request.attendees.contains(&"ada@students.test".to_string()));
    assert!(request.attendees.contains(&"mentor@mentors.test".to_string()));
    assert_eq!(
        market.notifier.sent(),
        vec![Notification::MeetingReady { booking_id, meet_url }]
    );
}

#[tokio::test]
async fn test_free_session_survives_provider_failure() {
    let market = TestMarketplace::new();
    market
        .provisioner
        .push_error(RemoteServiceError::permanent("meet", "401 Unauthorized"));
    let mentor_id = market.mentor();

    let outcome = market
        .coordinator()
        .request_booking(free_request(mentor_id, monday(), "02:00 PM"))
        .await
        .unwrap();

    let BookingOutcome::Confirmed { booking_id, meet_url } = outcome else {
        panic!("expected a confirmed booking, got {outcome:?}");
    };
    assert!(meet_url.is_none());
    assert!(market.store.get_booking(booking_id).unwrap().meet_url.is_none());
}

#[tokio::test]
async fn test_day_without_availability_is_rejected() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let tuesday = monday().succ_opt().unwrap();

    let result = market
        .coordinator()
        .request_booking(booking_request(mentor_id, tuesday, "09:00 AM", "order_A"))
        .await;

    assert_eq!(
        result,
        Err(MarketplaceError::NoAvailability {
            mentor_id,
            date: tuesday
        })
    );
    assert_eq!(market.store.write_count(), 0);
}

#[tokio::test]
async fn test_unknown_mentor_has_no_availability() {
    let market = TestMarketplace::new();
    let result = market
        .coordinator()
        .request_booking(booking_request(MentorId::new(), monday(), "09:00 AM", "order_A"))
        .await;
    assert!(matches!(result, Err(MarketplaceError::NoAvailability { .. })));
}

#[tokio::test]
async fn test_slot_outside_windows_is_rejected() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();

    // 11:45 + 30 minutes runs past the 12:00 window end.
    let result = market
        .coordinator()
        .request_booking(booking_request(mentor_id, monday(), "11:45 AM", "order_A"))
        .await;

    assert!(matches!(result, Err(MarketplaceError::Validation(_))));
    assert!(market.store.bookings().is_empty());
}

#[tokio::test]
async fn test_past_slot_is_rejected() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let last_week = monday() - chrono::TimeDelta::days(7);

    let result = market
        .coordinator()
        .request_booking(booking_request(mentor_id, last_week, "09:00 AM", "order_A"))
        .await;

    assert!(matches!(result, Err(MarketplaceError::Validation(_))));
}

#[tokio::test]
async fn test_storage_failure_surfaces_as_persistence() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    market.store.set_unavailable(true);

    let result = market
        .coordinator()
        .request_booking(booking_request(mentor_id, monday(), "09:00 AM", "order_A"))
        .await;

    assert!(matches!(result, Err(MarketplaceError::Persistence(_))));
}

#[tokio::test]
async fn test_open_slots_exclude_held_sessions() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    market
        .store
        .add_booking(fixtures::paid_booking(mentor_id, monday(), "10:00 AM", 60));

    let slots = market.coordinator().open_slots(mentor_id, monday(), 60).await.unwrap();

    let labels: Vec<String> = slots.iter().map(ToString::to_string).collect();
    assert_eq!(labels, ["09:00 AM", "11:00 AM", "02:00 PM", "03:00 PM", "04:00 PM"]);
}

#[tokio::test]
async fn test_open_slots_drop_started_sessions() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    market.clock.set(
        chrono::DateTime::parse_from_rfc3339("2025-06-02T14:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc),
    );

    let slots = market.coordinator().open_slots(mentor_id, monday(), 60).await.unwrap();

    let labels: Vec<String> = slots.iter().map(ToString::to_string).collect();
    assert_eq!(labels, ["03:00 PM", "04:00 PM"]);
}

#[tokio::test]
async fn test_open_slots_empty_without_availability() {
    let market = TestMarketplace::new();
    let mentor_id = market.mentor();
    let tuesday = monday() + chrono::TimeDelta::days(1);

    let coordinator = market.coordinator();
    assert!(coordinator.open_slots(mentor_id, tuesday, 30).await.unwrap().is_empty());
    assert!(coordinator.open_slots(MentorId::new(), monday(), 30).await.unwrap().is_empty());
    assert!(matches!(
        coordinator.open_slots(mentor_id, monday(), 0).await,
        Err(MarketplaceError::Validation(_))
    ));
}
