//! Explicit status state machines for reservations, bookings and payments.
//!
//! ```text
//! Reservation:  Pending ──► Confirmed ──► Cancelled
//!                  ├──────► Expired
//!                  └──────► Cancelled
//!
//! Booking:      PendingPayment ──► Confirmed ─────────┐
//!                  │  └──────────► ConfirmedUnpaid ───┼──► CheckedIn ──► CheckedOut
//!                  │                 │ (confirm_payment ► Confirmed)
//!                  └──────────────── ┴─────────────────┴──► Cancelled
//!
//! Payment:      Pending ──► Completed ──► Refunded
//!                  └──────► Failed
//!
//! Room (by hand): Dirty ──► Cleaning ──► Available, any ──► Maintenance;
//!                 Reserved/Occupied belong to the booking flow
//! ```
//!
//! Every transition function checks the legal predecessor and returns
//! [`HotelError::InvalidTransition`] otherwise, including for no-op moves.

use crate::error::{HotelError, Result};
use crate::types::{BookingStatus, PaymentStatus, Reservation, ReservationStatus, RoomStatus};
use chrono::{DateTime, Utc};

fn invalid(entity: &'static str, from: impl ToString, to: impl ToString) -> HotelError {
    HotelError::InvalidTransition {
        entity,
        from: from.to_string(),
        to: to.to_string(),
    }
}

// ============================================================================
// Reservation
// ============================================================================

impl ReservationStatus {
    /// Whether `self → next` is a legal move.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Expired | Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    /// Performs `self → next`.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::InvalidTransition`] for illegal moves.
    pub fn transition(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(invalid("reservation", self, next))
        }
    }

    /// Holds in these states block the room.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl Reservation {
    /// Status as seen by readers: a pending hold past its deadline reads
    /// as expired whether or not the sweep has persisted it yet.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> ReservationStatus {
        match self.status {
            ReservationStatus::Pending if self.expires_at <= now => ReservationStatus::Expired,
            status => status,
        }
    }

    /// Copy with the status replaced by the effective status.
    #[must_use]
    pub fn with_lazy_expiry(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }

    /// Whether this hold currently blocks its room.
    #[must_use]
    pub fn blocks_room(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now).is_active()
    }
}

// ============================================================================
// Booking
// ============================================================================

impl BookingStatus {
    /// Whether `self → next` is a legal generic status change.
    ///
    /// `ConfirmedUnpaid → Confirmed` is not: it goes through
    /// [`BookingStatus::confirm_payment`].
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::PendingPayment,
                Self::Confirmed | Self::ConfirmedUnpaid | Self::Cancelled
            ) | (
                Self::Confirmed | Self::ConfirmedUnpaid,
                Self::CheckedIn | Self::Cancelled
            ) | (Self::CheckedIn, Self::CheckedOut)
        )
    }

    /// Performs a generic status change.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::InvalidTransition`] for illegal moves.
    pub fn transition(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(invalid("booking", self, next))
        }
    }

    /// Cash received at the desk: `ConfirmedUnpaid → Confirmed`.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::InvalidTransition`] from any other state.
    pub fn confirm_payment(self) -> Result<Self> {
        match self {
            Self::ConfirmedUnpaid => Ok(Self::Confirmed),
            other => Err(invalid("booking", other, Self::Confirmed)),
        }
    }

    /// Bookings in these states block their rooms.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::PendingPayment | Self::Confirmed | Self::ConfirmedUnpaid | Self::CheckedIn
        )
    }

    /// Room status a booking in this state imposes when it is created.
    #[must_use]
    pub const fn room_status_at_creation(self) -> RoomStatus {
        match self {
            Self::CheckedIn => RoomStatus::Occupied,
            _ => RoomStatus::Reserved,
        }
    }
}

// ============================================================================
// Payment
// ============================================================================

impl PaymentStatus {
    /// Whether `self → next` is a legal move.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Failed) | (Self::Completed, Self::Refunded)
        )
    }

    /// Performs `self → next`.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::InvalidTransition`] for illegal moves.
    pub fn transition(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(invalid("payment", self, next))
        }
    }

    /// What happens to the payment when its booking is cancelled.
    #[must_use]
    pub const fn on_booking_cancelled(self) -> Option<Self> {
        match self {
            Self::Completed => Some(Self::Refunded),
            Self::Pending => Some(Self::Failed),
            Self::Failed | Self::Refunded => None,
        }
    }
}

// ============================================================================
// Room
// ============================================================================

impl RoomStatus {
    /// Whether staff may move a room from `self` to `next` by hand.
    ///
    /// `Reserved` and `Occupied` are only ever set by the booking flow, and
    /// an occupied room has to be checked out before it can be released.
    #[must_use]
    pub fn can_set_manually(self, next: Self) -> bool {
        match (self, next) {
            (_, Self::Reserved | Self::Occupied) | (Self::Occupied, Self::Available) => false,
            (from, to) => from != to,
        }
    }

    /// Performs a manual `self → next`.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::InvalidTransition`] for moves reserved to the
    /// booking flow.
    pub fn set_manually(self, next: Self) -> Result<Self> {
        if self.can_set_manually(next) {
            Ok(next)
        } else {
            Err(invalid("room", self, next))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn booking_lifecycle_is_monotonic() {
        use BookingStatus::*;
        let s = PendingPayment.transition(ConfirmedUnpaid).unwrap();
        let s = s.transition(CheckedIn).unwrap();
        let s = s.transition(CheckedOut).unwrap();
        assert!(matches!(
            s.transition(CheckedIn),
            Err(HotelError::InvalidTransition { .. })
        ));
        assert!(s.transition(Cancelled).is_err());
    }

    #[test]
    fn check_in_requires_confirmation() {
        assert!(
            BookingStatus::PendingPayment
                .transition(BookingStatus::CheckedIn)
                .is_err()
        );
        assert!(
            BookingStatus::CheckedIn
                .transition(BookingStatus::Cancelled)
                .is_err()
        );
    }

    #[test]
    fn confirm_payment_only_from_unpaid() {
        assert_eq!(
            BookingStatus::ConfirmedUnpaid.confirm_payment().unwrap(),
            BookingStatus::Confirmed
        );
        assert!(BookingStatus::Confirmed.confirm_payment().is_err());
        assert!(
            BookingStatus::ConfirmedUnpaid
                .transition(BookingStatus::Confirmed)
                .is_err()
        );
    }

    #[test]
    fn every_pair_matches_table() {
        for &from in BookingStatus::ALL {
            for &to in BookingStatus::ALL {
                assert_eq!(from.transition(to).is_ok(), from.can_transition_to(to));
            }
        }
        for &from in ReservationStatus::ALL {
            assert!(from.transition(from).is_err());
        }
    }

    #[test]
    fn reservation_moves() {
        use ReservationStatus::*;
        assert!(Pending.transition(Expired).is_ok());
        assert!(Confirmed.transition(Cancelled).is_ok());
        assert!(Expired.transition(Pending).is_err());
        assert!(Confirmed.transition(Expired).is_err());
    }

    #[test]
    fn payment_on_cancel() {
        assert_eq!(
            PaymentStatus::Completed.on_booking_cancelled(),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(
            PaymentStatus::Pending.on_booking_cancelled(),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(PaymentStatus::Refunded.on_booking_cancelled(), None);
    }

    #[test]
    fn housekeeping_moves() {
        use RoomStatus::*;
        assert_eq!(Dirty.set_manually(Cleaning).unwrap(), Cleaning);
        assert_eq!(Cleaning.set_manually(Available).unwrap(), Available);
        assert!(Available.set_manually(Maintenance).is_ok());
        assert!(Occupied.set_manually(Maintenance).is_ok());
        assert!(Available.set_manually(Reserved).is_err());
        assert!(Cleaning.set_manually(Occupied).is_err());
        assert!(Occupied.set_manually(Available).is_err());
        assert!(Dirty.set_manually(Dirty).is_err());
    }
}
