//! Error taxonomy shared by every marketplace component.
//!
//! [`MarketplaceError`] is what operations return to their callers. Storage
//! adapters report [`StoreError`], which converts into the taxonomy at the
//! boundary, and remote collaborators report [`RemoteServiceError`] with an
//! explicit retry classification.

use chrono::NaiveDate;
use thiserror::Error;

use crate::time_of_day::TimeOfDay;
use crate::types::MentorId;

/// Result alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketplaceError>;

/// Failure from an external collaborator (meeting API, notification service).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} call failed: {message}")]
pub struct RemoteServiceError {
    /// Which collaborator failed.
    pub service: &'static str,
    /// Human-readable cause.
    pub message: String,
    /// Whether repeating the identical call may succeed.
    pub retryable: bool,
}

impl RemoteServiceError {
    /// A failure worth retrying (timeouts, 5xx, throttling).
    #[must_use]
    pub fn retryable(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that will repeat no matter how often the call is made.
    #[must_use]
    pub fn permanent(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
            retryable: false,
        }
    }
}

/// Errors reported by persistence adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested slot was taken by a concurrent booking inside the transaction.
    #[error("slot already held by booking {0}")]
    SlotTaken(String),

    /// Another order already carries this gateway order id.
    #[error("external order id {0} is already in use")]
    DuplicateOrder(String),

    /// Database connection or query failure.
    #[error("database error: {0}")]
    Database(String),

    /// Stored data could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Marketplace error taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceError {
    /// Malformed or out-of-policy input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested slot overlaps a booking that holds it.
    #[error("slot {time} on {date} is no longer available for mentor {mentor_id}")]
    Conflict {
        /// Mentor whose calendar clashed.
        mentor_id: MentorId,
        /// Requested date.
        date: NaiveDate,
        /// Requested start.
        time: TimeOfDay,
    },

    /// The mentor has no availability configured for the date.
    #[error("mentor {mentor_id} has no availability on {date}")]
    NoAvailability {
        /// Mentor that was asked.
        mentor_id: MentorId,
        /// Requested date.
        date: NaiveDate,
    },

    /// Webhook signature missing or mismatched.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A record the caller referenced does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of record.
        resource: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// External collaborator failure.
    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    /// Storage failure.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl MarketplaceError {
    /// Shorthand for [`MarketplaceError::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`MarketplaceError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether the caller should expect a retry to help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteService(err) => err.retryable,
            Self::Persistence(_) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for MarketplaceError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}
