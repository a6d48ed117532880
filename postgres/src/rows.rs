//! Row decoding.

use mentorlink_core::types::{
    Booking, BookingId, ContactInfo, EnrollmentId, EventTypeId, MeetLink, MentorId, OrderId, OrderStatus,
    OrderTarget, PaymentOrder, ReferralRequestId, ScheduleEntry, StudentId, Workshop, WorkshopId,
};
use mentorlink_core::{StoreError, TimeOfDay};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use std::collections::BTreeMap;
use uuid::Uuid;

pub(crate) fn db(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn corrupt(column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(format!("{column}: {detail}"))
}

fn unsigned(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i32 = row.try_get(column).map_err(db)?;
    u32::try_from(value).map_err(|e| corrupt(column, e))
}

pub(crate) fn signed(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Columns selected for a booking, in every booking query.
pub(crate) const BOOKING_COLUMNS: &str = "b.id, b.mentor_id, b.student_id, b.event_id, b.date, b.time, \
     b.duration_minutes, b.payment_status, b.meet_url, b.completed, b.is_free_session, \
     b.contact_name, b.contact_email, b.contact_phone, b.created_at";

pub(crate) fn booking(row: &PgRow) -> Result<Booking, StoreError> {
    let time: String = row.try_get("time").map_err(db)?;
    Ok(Booking {
        id: BookingId::from_uuid(row.try_get("id").map_err(db)?),
        mentor_id: MentorId::from_uuid(row.try_get("mentor_id").map_err(db)?),
        student_id: row
            .try_get::<Option<Uuid>, _>("student_id")
            .map_err(db)?
            .map(StudentId::from_uuid),
        event_id: EventTypeId::from_uuid(row.try_get("event_id").map_err(db)?),
        date: row.try_get("date").map_err(db)?,
        time: TimeOfDay::parse(&time).map_err(|e| corrupt("time", e))?,
        duration_minutes: unsigned(row, "duration_minutes")?,
        payment_status: row.try_get("payment_status").map_err(db)?,
        meet_url: row.try_get("meet_url").map_err(db)?,
        completed: row.try_get("completed").map_err(db)?,
        is_free_session: row.try_get("is_free_session").map_err(db)?,
        contact: ContactInfo {
            name: row.try_get("contact_name").map_err(db)?,
            email: row.try_get("contact_email").map_err(db)?,
            phone: row.try_get("contact_phone").map_err(db)?,
        },
        created_at: row.try_get("created_at").map_err(db)?,
    })
}

pub(crate) const ORDER_COLUMNS: &str =
    "id, external_order_id, status, external_payment_id, target_kind, target_id, created_at, updated_at";

pub(crate) fn target(kind: &str, id: Uuid) -> Result<OrderTarget, StoreError> {
    match kind {
        "booking" => Ok(OrderTarget::Booking(BookingId::from_uuid(id))),
        "enrollment" => Ok(OrderTarget::Enrollment(EnrollmentId::from_uuid(id))),
        "referral" => Ok(OrderTarget::Referral(ReferralRequestId::from_uuid(id))),
        other => Err(corrupt("target_kind", other)),
    }
}

pub(crate) fn order(row: &PgRow) -> Result<PaymentOrder, StoreError> {
    let status: String = row.try_get("status").map_err(db)?;
    let kind: String = row.try_get("target_kind").map_err(db)?;
    Ok(PaymentOrder {
        id: OrderId::from_uuid(row.try_get("id").map_err(db)?),
        external_order_id: row.try_get("external_order_id").map_err(db)?,
        status: OrderStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        external_payment_id: row.try_get("external_payment_id").map_err(db)?,
        target: target(&kind, row.try_get("target_id").map_err(db)?)?,
        created_at: row.try_get("created_at").map_err(db)?,
        updated_at: row.try_get("updated_at").map_err(db)?,
    })
}

pub(crate) const WORKSHOP_COLUMNS: &str =
    "w.id, w.mentor_id, w.title, w.number_of_days, w.session_minutes, w.schedule, w.meet_links, w.active, w.starts_on";

pub(crate) fn workshop(row: &PgRow) -> Result<Workshop, StoreError> {
    let Json(schedule): Json<Vec<ScheduleEntry>> =
        row.try_get("schedule").map_err(|e| corrupt("schedule", e))?;
    let Json(meet_links): Json<BTreeMap<String, MeetLink>> =
        row.try_get("meet_links").map_err(|e| corrupt("meet_links", e))?;
    Ok(Workshop {
        id: WorkshopId::from_uuid(row.try_get("id").map_err(db)?),
        mentor_id: MentorId::from_uuid(row.try_get("mentor_id").map_err(db)?),
        title: row.try_get("title").map_err(db)?,
        number_of_days: unsigned(row, "number_of_days")?,
        session_minutes: unsigned(row, "session_minutes")?,
        schedule,
        meet_links,
        active: row.try_get("active").map_err(db)?,
        starts_on: row.try_get("starts_on").map_err(db)?,
    })
}
