//! In-memory implementation of every store port.
//!
//! One mutex guards all tables, so each port method is atomic the way a
//! single database transaction is. The store also counts reads and writes so
//! tests can assert that a rejected request touched nothing.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use mentorlink_core::StoreError;
use mentorlink_core::conflict::{Candidate, first_conflict};
use mentorlink_core::ports::{
    BookingStore, JobRunMarker, MentorDirectory, MergeOutcome, OrderTransition, PaymentOrderStore, ReadinessProbe,
    StoreFuture, WorkshopStore,
};
use mentorlink_core::types::{
    Availability, Booking, BookingId, EnrollmentId, MeetLink, MentorId, OrderId, OrderStatus, OrderTarget,
    PaymentOrder, ReferralRequest, ReferralRequestId, Workshop, WorkshopEnrollment, WorkshopId,
};
use mentorlink_core::webhook::TargetState;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
struct MentorRecord {
    email: Option<String>,
    availability: Option<Availability>,
}

#[derive(Debug, Default)]
struct Tables {
    mentors: HashMap<MentorId, MentorRecord>,
    bookings: HashMap<BookingId, Booking>,
    orders: HashMap<OrderId, PaymentOrder>,
    enrollments: HashMap<EnrollmentId, WorkshopEnrollment>,
    referrals: HashMap<ReferralRequestId, ReferralRequest>,
    workshops: BTreeMap<WorkshopId, Workshop>,
    job_runs: HashMap<String, DateTime<Utc>>,
    provisioning_claims: HashMap<BookingId, DateTime<Utc>>,
}

impl Tables {
    fn order_for_booking(&self, id: BookingId) -> Option<&PaymentOrder> {
        self.orders
            .values()
            .find(|order| order.target == OrderTarget::Booking(id))
    }

    fn holds_slot(&self, booking: &Booking) -> bool {
        booking.is_free_session
            || booking.payment_status
            || self
                .order_for_booking(booking.id)
                .is_some_and(|order| order.status == OrderStatus::Pending)
    }

    fn slot_holding(&self, mentor_id: MentorId, date: NaiveDate) -> Vec<Booking> {
        let from = date.pred_opt().unwrap_or(date);
        let to = date.succ_opt().unwrap_or(date);
        let mut found: Vec<Booking> = self
            .bookings
            .values()
            .filter(|b| b.mentor_id == mentor_id && b.date >= from && b.date <= to && self.holds_slot(b))
            .cloned()
            .collect();
        found.sort_by_key(Booking::start);
        found
    }
}

fn has_url(url: Option<&String>) -> bool {
    url.is_some_and(|u| !u.trim().is_empty())
}

/// In-memory marketplace store.
///
/// # Example
///
/// ```
/// use mentorlink_testing::InMemoryMarketplace;
/// use mentorlink_core::types::MentorId;
///
/// let store = InMemoryMarketplace::new();
/// store.add_mentor(MentorId::new(), "mentor@example.com", None);
/// assert_eq!(store.write_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryMarketplace {
    tables: Arc<Mutex<Tables>>,
    reads: Arc<AtomicU64>,
    writes: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryMarketplace {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Database("connection refused".into()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().unwrap())
    }

    fn write(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().unwrap())
    }

    /// Make every port call fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Port reads so far (seeding and inspection helpers do not count).
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Port writes so far, including writes that changed nothing.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Register a mentor.
    pub fn add_mentor(&self, mentor_id: MentorId, email: &str, availability: Option<Availability>) {
        self.tables.lock().unwrap().mentors.insert(
            mentor_id,
            MentorRecord {
                email: Some(email.to_string()),
                availability,
            },
        );
    }

    /// Insert a booking as-is.
    pub fn add_booking(&self, booking: Booking) {
        self.tables.lock().unwrap().bookings.insert(booking.id, booking);
    }

    /// Insert an order as-is.
    pub fn add_order(&self, order: PaymentOrder) {
        self.tables.lock().unwrap().orders.insert(order.id, order);
    }

    /// Insert an enrollment.
    pub fn add_enrollment(&self, enrollment: WorkshopEnrollment) {
        self.tables.lock().unwrap().enrollments.insert(enrollment.id, enrollment);
    }

    /// Insert a referral request.
    pub fn add_referral(&self, referral: ReferralRequest) {
        self.tables.lock().unwrap().referrals.insert(referral.id, referral);
    }

    /// Insert a workshop.
    pub fn add_workshop(&self, workshop: Workshop) {
        self.tables.lock().unwrap().workshops.insert(workshop.id, workshop);
    }

    /// Remove a booking, leaving its orders dangling.
    pub fn remove_booking(&self, id: BookingId) {
        self.tables.lock().unwrap().bookings.remove(&id);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Current state of a booking.
    #[must_use]
    pub fn get_booking(&self, id: BookingId) -> Option<Booking> {
        self.tables.lock().unwrap().bookings.get(&id).cloned()
    }

    /// Current state of an order.
    #[must_use]
    pub fn get_order(&self, id: OrderId) -> Option<PaymentOrder> {
        self.tables.lock().unwrap().orders.get(&id).cloned()
    }

    /// Current state of an enrollment.
    #[must_use]
    pub fn get_enrollment(&self, id: EnrollmentId) -> Option<WorkshopEnrollment> {
        self.tables.lock().unwrap().enrollments.get(&id).cloned()
    }

    /// Current state of a referral request.
    #[must_use]
    pub fn get_referral(&self, id: ReferralRequestId) -> Option<ReferralRequest> {
        self.tables.lock().unwrap().referrals.get(&id).cloned()
    }

    /// Current state of a workshop.
    #[must_use]
    pub fn get_workshop(&self, id: WorkshopId) -> Option<Workshop> {
        self.tables.lock().unwrap().workshops.get(&id).cloned()
    }

    /// Every booking, oldest first.
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        let mut all: Vec<Booking> = self.tables.lock().unwrap().bookings.values().cloned().collect();
        all.sort_by_key(|b| b.created_at);
        all
    }

    /// Every order.
    #[must_use]
    pub fn orders(&self) -> Vec<PaymentOrder> {
        self.tables.lock().unwrap().orders.values().cloned().collect()
    }

    /// Last recorded start of a job.
    #[must_use]
    pub fn last_job_run(&self, job: &str) -> Option<DateTime<Utc>> {
        self.tables.lock().unwrap().job_runs.get(job).copied()
    }
}

impl MentorDirectory for InMemoryMarketplace {
    fn availability(&self, mentor_id: MentorId) -> StoreFuture<'_, Option<Availability>> {
        let result = self
            .read()
            .map(|t| t.mentors.get(&mentor_id).and_then(|m| m.availability.clone()));
        Box::pin(async move { result })
    }

    fn mentor_email(&self, mentor_id: MentorId) -> StoreFuture<'_, Option<String>> {
        let result = self
            .read()
            .map(|t| t.mentors.get(&mentor_id).and_then(|m| m.email.clone()));
        Box::pin(async move { result })
    }
}

impl BookingStore for InMemoryMarketplace {
    fn slot_holding_bookings(&self, mentor_id: MentorId, date: NaiveDate) -> StoreFuture<'_, Vec<Booking>> {
        let result = self.read().map(|t| t.slot_holding(mentor_id, date));
        Box::pin(async move { result })
    }

    fn insert_booking(&self, booking: Booking, order: Option<PaymentOrder>) -> StoreFuture<'_, ()> {
        let result = self.write().and_then(|mut t| {
            let candidate = Candidate {
                date: booking.date,
                time: booking.time,
                duration_minutes: booking.duration_minutes,
            };
            let holding = t.slot_holding(booking.mentor_id, booking.date);
            if let Some(clash) = first_conflict(&candidate, &holding) {
                return Err(StoreError::SlotTaken(clash.id.to_string()));
            }
            if let Some(order) = &order {
                if t.orders
                    .values()
                    .any(|o| o.external_order_id == order.external_order_id)
                {
                    return Err(StoreError::DuplicateOrder(order.external_order_id.clone()));
                }
            }
            t.bookings.insert(booking.id, booking);
            if let Some(order) = order {
                t.orders.insert(order.id, order);
            }
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        let result = self.read().map(|t| t.bookings.get(&id).cloned());
        Box::pin(async move { result })
    }

    fn set_meet_url_if_empty(&self, id: BookingId, meet_url: String) -> StoreFuture<'_, bool> {
        let result = self.write().map(|mut t| match t.bookings.get_mut(&id) {
            Some(b) if !has_url(b.meet_url.as_ref()) && (b.payment_status || b.is_free_session) => {
                b.meet_url = Some(meet_url);
                true
            }
            _ => false,
        });
        Box::pin(async move { result })
    }

    fn claim_provisioning(&self, id: BookingId, now: DateTime<Utc>, lease: TimeDelta) -> StoreFuture<'_, bool> {
        let result = self.write().map(|mut t| {
            let claimable = t
                .bookings
                .get(&id)
                .is_some_and(|b| !has_url(b.meet_url.as_ref()) && (b.payment_status || b.is_free_session));
            let held = t.provisioning_claims.get(&id).is_some_and(|at| now - *at < lease);
            if claimable && !held {
                t.provisioning_claims.insert(id, now);
                true
            } else {
                false
            }
        });
        Box::pin(async move { result })
    }

    fn release_provisioning(&self, id: BookingId) -> StoreFuture<'_, ()> {
        let result = self.write().map(|mut t| {
            t.provisioning_claims.remove(&id);
        });
        Box::pin(async move { result })
    }

    fn bookings_missing_meet_url(&self, from: NaiveDate, limit: u32) -> StoreFuture<'_, Vec<Booking>> {
        let result = self.read().map(|t| {
            let mut found: Vec<Booking> = t
                .bookings
                .values()
                .filter(|b| {
                    b.date >= from && !b.completed && (b.payment_status || b.is_free_session) && !has_url(b.meet_url.as_ref())
                })
                .cloned()
                .collect();
            found.sort_by_key(|b| b.created_at);
            found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            found
        });
        Box::pin(async move { result })
    }
}

impl PaymentOrderStore for InMemoryMarketplace {
    fn order_by_external_id(&self, external_order_id: String) -> StoreFuture<'_, Option<PaymentOrder>> {
        let result = self.read().map(|t| {
            t.orders
                .values()
                .find(|o| o.external_order_id == external_order_id)
                .cloned()
        });
        Box::pin(async move { result })
    }

    fn order_by_payment_id(&self, payment_id: String) -> StoreFuture<'_, Option<PaymentOrder>> {
        let result = self.read().map(|t| {
            t.orders
                .values()
                .find(|o| o.external_payment_id.as_deref() == Some(payment_id.as_str()))
                .cloned()
        });
        Box::pin(async move { result })
    }

    fn target_state(&self, target: OrderTarget) -> StoreFuture<'_, Option<TargetState>> {
        let result = self.read().map(|t| match target {
            OrderTarget::Booking(id) => t.bookings.get(&id).map(|b| TargetState {
                target,
                payment_status: b.payment_status,
                meet_url: b.meet_url.clone(),
            }),
            OrderTarget::Enrollment(id) => t.enrollments.get(&id).map(|e| TargetState {
                target,
                payment_status: e.payment_status,
                meet_url: None,
            }),
            OrderTarget::Referral(id) => t.referrals.get(&id).map(|r| TargetState {
                target,
                payment_status: r.payment_status,
                meet_url: None,
            }),
        });
        Box::pin(async move { result })
    }

    fn apply_transition(&self, order_id: OrderId, transition: OrderTransition) -> StoreFuture<'_, bool> {
        let result = self.write().map(|mut t| {
            let Some(order) = t.orders.get_mut(&order_id) else {
                return false;
            };
            if order.status != transition.from {
                return false;
            }
            order.status = transition.to;
            order.updated_at = transition.at;
            if let Some(payment_id) = transition.payment_id {
                order.external_payment_id = Some(payment_id);
            }

            match transition.target {
                OrderTarget::Booking(id) => {
                    if let Some(b) = t.bookings.get_mut(&id) {
                        b.payment_status = transition.payment_status;
                        if transition.clear_meet_url {
                            b.meet_url = None;
                        }
                    }
                }
                OrderTarget::Enrollment(id) => {
                    if let Some(e) = t.enrollments.get_mut(&id) {
                        e.payment_status = transition.payment_status;
                    }
                }
                OrderTarget::Referral(id) => {
                    if let Some(r) = t.referrals.get_mut(&id) {
                        r.payment_status = transition.payment_status;
                    }
                }
            }
            true
        });
        Box::pin(async move { result })
    }
}

impl WorkshopStore for InMemoryMarketplace {
    fn active_paid_workshops(&self, after: Option<WorkshopId>, limit: u32) -> StoreFuture<'_, Vec<Workshop>> {
        let result = self.read().map(|t| {
            t.workshops
                .values()
                .filter(|w| w.active && after.is_none_or(|after| w.id > after))
                .filter(|w| {
                    t.enrollments
                        .values()
                        .any(|e| e.workshop_id == w.id && e.payment_status)
                })
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect()
        });
        Box::pin(async move { result })
    }

    fn attendee_emails(&self, workshop_id: WorkshopId) -> StoreFuture<'_, Vec<String>> {
        let result = self.read().map(|t| {
            let mut emails: Vec<String> = t
                .enrollments
                .values()
                .filter(|e| e.workshop_id == workshop_id && e.payment_status)
                .map(|e| e.student_email.clone())
                .collect();
            emails.sort();
            emails
        });
        Box::pin(async move { result })
    }

    fn anchor_schedule(&self, workshop_id: WorkshopId, starts_on: NaiveDate) -> StoreFuture<'_, NaiveDate> {
        let result = self.write().and_then(|mut t| {
            let workshop = t
                .workshops
                .get_mut(&workshop_id)
                .ok_or_else(|| StoreError::Database(format!("workshop {workshop_id} not found")))?;
            Ok(*workshop.starts_on.get_or_insert(starts_on))
        });
        Box::pin(async move { result })
    }

    fn merge_meet_links(
        &self,
        workshop_id: WorkshopId,
        links: BTreeMap<String, MeetLink>,
    ) -> StoreFuture<'_, MergeOutcome> {
        let result = self.write().and_then(|mut t| {
            let workshop = t
                .workshops
                .get_mut(&workshop_id)
                .ok_or_else(|| StoreError::Database(format!("workshop {workshop_id} not found")))?;
            let mut outcome = MergeOutcome::default();
            for (key, link) in links {
                if workshop.meet_links.get(&key).is_some_and(|l| !l.link.trim().is_empty()) {
                    outcome.skipped.push(key);
                } else {
                    workshop.meet_links.insert(key.clone(), link);
                    outcome.written.push(key);
                }
            }
            Ok(outcome)
        });
        Box::pin(async move { result })
    }
}

impl JobRunMarker for InMemoryMarketplace {
    fn try_begin(&self, job: &'static str, now: DateTime<Utc>, cooldown: TimeDelta) -> StoreFuture<'_, bool> {
        let result = self.write().map(|mut t| {
            let recent = t.job_runs.get(job).is_some_and(|last| now - *last < cooldown);
            if recent {
                false
            } else {
                t.job_runs.insert(job.to_string(), now);
                true
            }
        });
        Box::pin(async move { result })
    }
}

impl ReadinessProbe for InMemoryMarketplace {
    fn ping(&self) -> StoreFuture<'_, ()> {
        let result = self.check();
        Box::pin(async move { result })
    }
}
