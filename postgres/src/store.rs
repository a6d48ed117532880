//! `PostgreSQL` implementation of every marketplace store port.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use mentorlink_core::StoreError;
use mentorlink_core::conflict::{Candidate, first_conflict};
use mentorlink_core::ports::{
    BookingStore, JobRunMarker, MentorDirectory, MergeOutcome, OrderTransition, PaymentOrderStore, ReadinessProbe,
    StoreFuture, WorkshopStore,
};
use mentorlink_core::types::{
    Availability, Booking, BookingId, MeetLink, MentorId, OrderId, OrderTarget, PaymentOrder, ReferralRequest,
    Workshop, WorkshopEnrollment, WorkshopId,
};
use mentorlink_core::webhook::TargetState;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Row, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::rows::{self, BOOKING_COLUMNS, ORDER_COLUMNS, WORKSHOP_COLUMNS, db, signed};

/// A booking holds its slot while free, paid, or awaiting a pending order.
const SLOT_HOLDING: &str = "(b.is_free_session OR b.payment_status OR EXISTS (\
     SELECT 1 FROM payment_orders o \
     WHERE o.target_kind = 'booking' AND o.target_id = b.id AND o.status = 'pending'))";

const MISSING_URL: &str = "(b.meet_url IS NULL OR btrim(b.meet_url) = '')";

/// `PostgreSQL` marketplace store.
///
/// # Example
///
/// ```no_run
/// use mentorlink_postgres::PgMarketplaceStore;
///
/// # async fn example() -> Result<(), mentorlink_core::StoreError> {
/// let store = PgMarketplaceStore::connect("postgres://localhost/mentorlink", 10).await?;
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PgMarketplaceStore {
    pool: PgPool,
}

impl PgMarketplaceStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // Provisioning of reference data
    // ------------------------------------------------------------------

    /// Create or update a mentor profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn upsert_mentor(
        &self,
        mentor_id: MentorId,
        email: &str,
        availability: Option<&Availability>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO mentors (id, email, availability) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, availability = EXCLUDED.availability
            ",
        )
        .bind(mentor_id.as_uuid())
        .bind(email)
        .bind(availability.map(Json))
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Insert a workshop.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert_workshop(&self, workshop: &Workshop) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO workshops
                (id, mentor_id, title, number_of_days, session_minutes, schedule, meet_links, active, starts_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(workshop.id.as_uuid())
        .bind(workshop.mentor_id.as_uuid())
        .bind(&workshop.title)
        .bind(signed(workshop.number_of_days))
        .bind(signed(workshop.session_minutes))
        .bind(Json(&workshop.schedule))
        .bind(Json(&workshop.meet_links))
        .bind(workshop.active)
        .bind(workshop.starts_on)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Insert a workshop enrollment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert_enrollment(&self, enrollment: &WorkshopEnrollment) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO workshop_enrollments (id, workshop_id, student_id, student_email, payment_status)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(enrollment.id.as_uuid())
        .bind(enrollment.workshop_id.as_uuid())
        .bind(enrollment.student_id.as_uuid())
        .bind(&enrollment.student_email)
        .bind(enrollment.payment_status)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Insert a referral request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert_referral(&self, referral: &ReferralRequest) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO referral_requests (id, mentor_id, student_id, payment_status) VALUES ($1, $2, $3, $4)",
        )
        .bind(referral.id.as_uuid())
        .bind(referral.mentor_id.as_uuid())
        .bind(referral.student_id.as_uuid())
        .bind(referral.payment_status)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    /// Insert a payment order on its own, for targets other than bookings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn insert_order(&self, order: &PaymentOrder) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(db)?;
        insert_order(&mut *conn, order).await
    }

    /// Load a workshop.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or decoding fails.
    pub async fn workshop(&self, workshop_id: WorkshopId) -> Result<Option<Workshop>, StoreError> {
        let query = format!("SELECT {WORKSHOP_COLUMNS} FROM workshops w WHERE w.id = $1");
        sqlx::query(&query)
            .bind(workshop_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .as_ref()
            .map(rows::workshop)
            .transpose()
    }

    /// Load an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or decoding fails.
    pub async fn order(&self, order_id: OrderId) -> Result<Option<PaymentOrder>, StoreError> {
        self.order_where("id = $1", *order_id.as_uuid()).await
    }

    async fn order_where<T>(&self, predicate: &str, value: T) -> Result<Option<PaymentOrder>, StoreError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let query = format!("SELECT {ORDER_COLUMNS} FROM payment_orders WHERE {predicate}");
        sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .as_ref()
            .map(rows::order)
            .transpose()
    }
}

async fn insert_order(conn: &mut sqlx::PgConnection, order: &PaymentOrder) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO payment_orders
            (id, external_order_id, status, external_payment_id, target_kind, target_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(order.id.as_uuid())
    .bind(&order.external_order_id)
    .bind(order.status.as_str())
    .bind(&order.external_payment_id)
    .bind(order.target.kind())
    .bind(order.target.uuid())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            StoreError::DuplicateOrder(order.external_order_id.clone())
        } else {
            db(e)
        }
    })?;
    Ok(())
}

async fn holding_bookings<'e, E>(executor: E, mentor_id: MentorId, date: NaiveDate) -> Result<Vec<Booking>, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let from = date.pred_opt().unwrap_or(date);
    let to = date.succ_opt().unwrap_or(date);
    let query = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b \
         WHERE b.mentor_id = $1 AND b.date BETWEEN $2 AND $3 AND {SLOT_HOLDING} \
         ORDER BY b.date, b.created_at"
    );
    sqlx::query(&query)
        .bind(mentor_id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await
        .map_err(db)?
        .iter()
        .map(rows::booking)
        .collect()
}

/// Serialize booking transactions for a mentor around `date`.
///
/// Sessions may spill over midnight, so the neighbouring days are locked too,
/// always in ascending order so two transactions cannot deadlock.
async fn lock_slot_days(
    tx: &mut Transaction<'_, Postgres>,
    mentor_id: MentorId,
    date: NaiveDate,
) -> Result<(), StoreError> {
    let days = [date.pred_opt(), Some(date), date.succ_opt()];
    for day in days.into_iter().flatten() {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{mentor_id}:{day}"))
            .execute(&mut **tx)
            .await
            .map_err(db)?;
    }
    Ok(())
}

impl MentorDirectory for PgMarketplaceStore {
    fn availability(&self, mentor_id: MentorId) -> StoreFuture<'_, Option<Availability>> {
        Box::pin(async move {
            let row: Option<(Option<Json<Availability>>,)> =
                sqlx::query_as("SELECT availability FROM mentors WHERE id = $1")
                    .bind(mentor_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db)?;
            Ok(row.and_then(|(availability,)| availability.map(|Json(a)| a)))
        })
    }

    fn mentor_email(&self, mentor_id: MentorId) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let row: Option<(Option<String>,)> = sqlx::query_as("SELECT email FROM mentors WHERE id = $1")
                .bind(mentor_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db)?;
            Ok(row.and_then(|(email,)| email).filter(|e| !e.trim().is_empty()))
        })
    }
}

impl BookingStore for PgMarketplaceStore {
    fn slot_holding_bookings(&self, mentor_id: MentorId, date: NaiveDate) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move { holding_bookings(&self.pool, mentor_id, date).await })
    }

    fn insert_booking(&self, booking: Booking, order: Option<PaymentOrder>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db)?;
            lock_slot_days(&mut tx, booking.mentor_id, booking.date).await?;

            let holding = holding_bookings(&mut *tx, booking.mentor_id, booking.date).await?;
            let candidate = Candidate {
                date: booking.date,
                time: booking.time,
                duration_minutes: booking.duration_minutes,
            };
            if let Some(clash) = first_conflict(&candidate, &holding) {
                metrics::counter!("booking_slot_races_total").increment(1);
                return Err(StoreError::SlotTaken(clash.id.to_string()));
            }

            sqlx::query(
                r"
                INSERT INTO bookings (
                    id, mentor_id, student_id, event_id, date, time, duration_minutes, payment_status,
                    meet_url, completed, is_free_session, contact_name, contact_email, contact_phone, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ",
            )
            .bind(booking.id.as_uuid())
            .bind(booking.mentor_id.as_uuid())
            .bind(booking.student_id.map(|id| *id.as_uuid()))
            .bind(booking.event_id.as_uuid())
            .bind(booking.date)
            .bind(booking.time.to_string())
            .bind(signed(booking.duration_minutes))
            .bind(booking.payment_status)
            .bind(&booking.meet_url)
            .bind(booking.completed)
            .bind(booking.is_free_session)
            .bind(&booking.contact.name)
            .bind(&booking.contact.email)
            .bind(&booking.contact.phone)
            .bind(booking.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

            if let Some(order) = &order {
                insert_order(&mut *tx, order).await?;
            }

            tx.commit().await.map_err(db)?;
            tracing::debug!(booking_id = %booking.id, mentor_id = %booking.mentor_id, "Booking inserted");
            Ok(())
        })
    }

    fn booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = $1");
            sqlx::query(&query)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db)?
                .as_ref()
                .map(rows::booking)
                .transpose()
        })
    }

    fn set_meet_url_if_empty(&self, id: BookingId, meet_url: String) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let query = format!(
                "UPDATE bookings b SET meet_url = $2 \
                 WHERE b.id = $1 AND {MISSING_URL} AND (b.payment_status OR b.is_free_session)"
            );
            let result = sqlx::query(&query)
                .bind(id.as_uuid())
                .bind(meet_url)
                .execute(&self.pool)
                .await
                .map_err(db)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn claim_provisioning(&self, id: BookingId, now: DateTime<Utc>, lease: TimeDelta) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let expired = now.checked_sub_signed(lease).unwrap_or(DateTime::<Utc>::MIN_UTC);
            let query = format!(
                "UPDATE bookings b SET provisioning_claimed_at = $2 \
                 WHERE b.id = $1 AND {MISSING_URL} AND (b.payment_status OR b.is_free_session) \
                 AND (b.provisioning_claimed_at IS NULL OR b.provisioning_claimed_at <= $3)"
            );
            let result = sqlx::query(&query)
                .bind(id.as_uuid())
                .bind(now)
                .bind(expired)
                .execute(&self.pool)
                .await
                .map_err(db)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn release_provisioning(&self, id: BookingId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE bookings SET provisioning_claimed_at = NULL WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(db)?;
            Ok(())
        })
    }

    fn bookings_missing_meet_url(&self, from: NaiveDate, limit: u32) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings b \
                 WHERE b.date >= $1 AND NOT b.completed AND (b.payment_status OR b.is_free_session) \
                 AND {MISSING_URL} \
                 ORDER BY b.created_at LIMIT $2"
            );
            sqlx::query(&query)
                .bind(from)
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
                .map_err(db)?
                .iter()
                .map(rows::booking)
                .collect()
        })
    }
}

impl PaymentOrderStore for PgMarketplaceStore {
    fn order_by_external_id(&self, external_order_id: String) -> StoreFuture<'_, Option<PaymentOrder>> {
        Box::pin(async move { self.order_where("external_order_id = $1", external_order_id).await })
    }

    fn order_by_payment_id(&self, payment_id: String) -> StoreFuture<'_, Option<PaymentOrder>> {
        Box::pin(async move {
            self.order_where(
                "external_payment_id = $1 ORDER BY updated_at DESC LIMIT 1",
                payment_id,
            )
            .await
        })
    }

    fn target_state(&self, target: OrderTarget) -> StoreFuture<'_, Option<TargetState>> {
        Box::pin(async move {
            let id = *target.uuid();
            let row: Option<(bool, Option<String>)> = match target {
                OrderTarget::Booking(_) => {
                    sqlx::query_as::<_, (bool, Option<String>)>("SELECT payment_status, meet_url FROM bookings WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await
                }
                OrderTarget::Enrollment(_) => {
                    sqlx::query_as::<_, (bool, Option<String>)>("SELECT payment_status, NULL::text FROM workshop_enrollments WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await
                }
                OrderTarget::Referral(_) => {
                    sqlx::query_as::<_, (bool, Option<String>)>("SELECT payment_status, NULL::text FROM referral_requests WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await
                }
            }
            .map_err(db)?;

            Ok(row.map(|(payment_status, meet_url)| TargetState {
                target,
                payment_status,
                meet_url,
            }))
        })
    }

    fn apply_transition(&self, order_id: OrderId, transition: OrderTransition) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db)?;

            let moved = sqlx::query(
                r"
                UPDATE payment_orders
                SET status = $3, updated_at = $4, external_payment_id = COALESCE($5, external_payment_id)
                WHERE id = $1 AND status = $2
                ",
            )
            .bind(order_id.as_uuid())
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .bind(transition.at)
            .bind(&transition.payment_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

            if moved.rows_affected() == 0 {
                tx.rollback().await.map_err(db)?;
                return Ok(false);
            }

            let target_id: Uuid = *transition.target.uuid();
            match transition.target {
                OrderTarget::Booking(_) => {
                    sqlx::query(
                        r"
                        UPDATE bookings
                        SET payment_status = $2, meet_url = CASE WHEN $3 THEN NULL ELSE meet_url END
                        WHERE id = $1
                        ",
                    )
                    .bind(target_id)
                    .bind(transition.payment_status)
                    .bind(transition.clear_meet_url)
                    .execute(&mut *tx)
                    .await
                    .map_err(db)?;
                }
                OrderTarget::Enrollment(_) => {
                    sqlx::query("UPDATE workshop_enrollments SET payment_status = $2 WHERE id = $1")
                        .bind(target_id)
                        .bind(transition.payment_status)
                        .execute(&mut *tx)
                        .await
                        .map_err(db)?;
                }
                OrderTarget::Referral(_) => {
                    sqlx::query("UPDATE referral_requests SET payment_status = $2 WHERE id = $1")
                        .bind(target_id)
                        .bind(transition.payment_status)
                        .execute(&mut *tx)
                        .await
                        .map_err(db)?;
                }
            }

            tx.commit().await.map_err(db)?;
            Ok(true)
        })
    }
}

impl WorkshopStore for PgMarketplaceStore {
    fn active_paid_workshops(&self, after: Option<WorkshopId>, limit: u32) -> StoreFuture<'_, Vec<Workshop>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {WORKSHOP_COLUMNS} FROM workshops w \
                 WHERE w.active AND ($1::uuid IS NULL OR w.id > $1) \
                 AND EXISTS (SELECT 1 FROM workshop_enrollments e WHERE e.workshop_id = w.id AND e.payment_status) \
                 ORDER BY w.id LIMIT $2"
            );
            sqlx::query(&query)
                .bind(after.map(|id| *id.as_uuid()))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
                .map_err(db)?
                .iter()
                .map(rows::workshop)
                .collect()
        })
    }

    fn attendee_emails(&self, workshop_id: WorkshopId) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let emails: Vec<(String,)> = sqlx::query_as(
                r"
                SELECT DISTINCT student_email FROM workshop_enrollments
                WHERE workshop_id = $1 AND payment_status AND btrim(student_email) <> ''
                ORDER BY student_email
                ",
            )
            .bind(workshop_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
            Ok(emails.into_iter().map(|(email,)| email).collect())
        })
    }

    fn anchor_schedule(&self, workshop_id: WorkshopId, starts_on: NaiveDate) -> StoreFuture<'_, NaiveDate> {
        Box::pin(async move {
            let row: Option<(NaiveDate,)> = sqlx::query_as(
                r"
                UPDATE workshops SET starts_on = COALESCE(starts_on, $2)
                WHERE id = $1
                RETURNING starts_on
                ",
            )
            .bind(workshop_id.as_uuid())
            .bind(starts_on)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
            row.map(|(anchor,)| anchor)
                .ok_or_else(|| StoreError::Database(format!("workshop {workshop_id} not found")))
        })
    }

    fn merge_meet_links(
        &self,
        workshop_id: WorkshopId,
        links: BTreeMap<String, MeetLink>,
    ) -> StoreFuture<'_, MergeOutcome> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db)?;

            let row = sqlx::query("SELECT meet_links FROM workshops WHERE id = $1 FOR UPDATE")
                .bind(workshop_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?
                .ok_or_else(|| StoreError::Database(format!("workshop {workshop_id} not found")))?;
            let Json(mut stored): Json<BTreeMap<String, MeetLink>> = row
                .try_get("meet_links")
                .map_err(|e| StoreError::Serialization(format!("meet_links: {e}")))?;

            let mut outcome = MergeOutcome::default();
            for (key, link) in links {
                if stored.get(&key).is_some_and(|l| !l.link.trim().is_empty()) {
                    outcome.skipped.push(key);
                } else {
                    stored.insert(key.clone(), link);
                    outcome.written.push(key);
                }
            }

            if !outcome.written.is_empty() {
                sqlx::query("UPDATE workshops SET meet_links = $2 WHERE id = $1")
                    .bind(workshop_id.as_uuid())
                    .bind(Json(&stored))
                    .execute(&mut *tx)
                    .await
                    .map_err(db)?;
            }
            tx.commit().await.map_err(db)?;
            Ok(outcome)
        })
    }
}

impl JobRunMarker for PgMarketplaceStore {
    fn try_begin(&self, job: &'static str, now: DateTime<Utc>, cooldown: TimeDelta) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let threshold = now.checked_sub_signed(cooldown).unwrap_or(DateTime::<Utc>::MIN_UTC);
            let row: Option<(String,)> = sqlx::query_as(
                r"
                INSERT INTO job_runs (job, last_started_at) VALUES ($1, $2)
                ON CONFLICT (job) DO UPDATE SET last_started_at = EXCLUDED.last_started_at
                WHERE job_runs.last_started_at <= $3
                RETURNING job
                ",
            )
            .bind(job)
            .bind(now)
            .bind(threshold)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
            Ok(row.is_some())
        })
    }
}

impl ReadinessProbe for PgMarketplaceStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await.map_err(db)?;
            Ok(())
        })
    }
}
