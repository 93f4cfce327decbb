//! Post-commit notifications.
//!
//! Managers publish a [`Notification`] only after their transaction has
//! committed. Delivery is best-effort: a failing [`Notifier`] is logged and
//! never fails or rolls back the operation that triggered it.

use crate::types::{BookingId, BookingStatus, ReservationId, RoomId, UserId};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Outbound message for guests and staff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A hold was placed.
    ReservationCreated {
        /// Guest to notify
        guest_id: UserId,
        /// New hold
        reservation_id: ReservationId,
        /// Human-readable code
        code: String,
    },
    /// A hold was cancelled.
    ReservationCancelled {
        /// Guest to notify
        guest_id: UserId,
        /// Cancelled hold
        reservation_id: ReservationId,
    },
    /// A booking was committed.
    BookingCreated {
        /// Guest to notify
        guest_id: UserId,
        /// New booking
        booking_id: BookingId,
        /// Human-readable code
        code: String,
        /// Initial status
        status: BookingStatus,
    },
    /// A booking moved along its lifecycle.
    BookingStatusChanged {
        /// Guest to notify
        guest_id: UserId,
        /// Booking
        booking_id: BookingId,
        /// Previous status
        from: BookingStatus,
        /// New status
        to: BookingStatus,
    },
    /// Cash payment received at the desk.
    PaymentConfirmed {
        /// Guest to notify
        guest_id: UserId,
        /// Booking paid for
        booking_id: BookingId,
    },
    /// A room needs cleaning after check-out.
    HousekeepingRequested {
        /// Room to clean
        room_id: RoomId,
        /// Booking that vacated it
        booking_id: BookingId,
    },
}

impl Notification {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReservationCreated { .. } => "reservation_created",
            Self::ReservationCancelled { .. } => "reservation_cancelled",
            Self::BookingCreated { .. } => "booking_created",
            Self::BookingStatusChanged { .. } => "booking_status_changed",
            Self::PaymentConfirmed { .. } => "payment_confirmed",
            Self::HousekeepingRequested { .. } => "housekeeping_requested",
        }
    }
}

/// Delivery failure.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The downstream consumer is gone.
    #[error("Notification sink closed")]
    Closed,

    /// Any other delivery failure.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Sink for post-commit notifications.
pub trait Notifier: Send + Sync {
    /// Hands one notification to the sink.
    fn publish(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}

/// Publishes every notification, logging and swallowing failures.
pub async fn publish_all(notifier: &dyn Notifier, notifications: Vec<Notification>) {
    for notification in notifications {
        let kind = notification.kind();
        if let Err(error) = notifier.publish(notification).await {
            tracing::warn!(kind, error = %error, "Failed to publish notification");
            metrics::counter!("hotel.notifications.failed").increment(1);
        }
    }
}
