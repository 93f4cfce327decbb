//! Error taxonomy for the booking core.

use crate::money::Money;
use thiserror::Error;

/// Result alias used throughout the core.
pub type Result<T, E = HotelError> = std::result::Result<T, E>;

/// Errors surfaced by the reservation and booking managers.
///
/// Variants are grouped the way callers must react to them: validation
/// problems are fixed by the client, capacity problems by choosing other
/// dates, consistency problems by re-quoting.
#[derive(Error, Debug)]
pub enum HotelError {
    /// Malformed or missing input (bad dates, empty room list, ...).
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of entity ("Room type", "Reservation", ...)
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// No room of the requested type is free for the window.
    #[error("No rooms available for the selected dates: {0}")]
    NoAvailability(String),

    /// A specific room was claimed by someone else before commit.
    #[error("Room {room_id} is no longer available for the selected dates")]
    RoomUnavailable {
        /// Room that failed the re-check
        room_id: String,
    },

    /// The referenced hold is past its deadline or no longer pending.
    #[error("Reservation {0} has expired or is no longer active")]
    ReservationExpired(String),

    /// Client-submitted total disagrees with the server's recomputation.
    #[error("Price mismatch: expected total {expected}, submitted {submitted}")]
    PriceMismatch {
        /// Server-side total
        expected: Money,
        /// Total sent by the client
        submitted: Money,
    },

    /// Status change not allowed from the current state.
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        /// Aggregate kind
        entity: &'static str,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Caller may not act on this resource.
    #[error("{0}")]
    Forbidden(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HotelError {
    /// Shorthand for [`HotelError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`HotelError::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Errors raised by [`crate::store::HotelStore`] implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A persisted row could not be mapped back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A storage-level uniqueness or exclusion rule rejected the write.
    #[error("Conflicting write: {0}")]
    Conflict(String),
}
