//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod bookings;
pub mod health;
pub mod webhooks;

pub use bookings::{create_booking, list_slots};
pub use health::{health_check, metrics, readiness_check};
pub use webhooks::payment_webhook;
