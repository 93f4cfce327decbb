//! Reservation manager: time-boxed soft holds on one room.
//!
//! ```text
//! create ──► begin ──► load type ──► scan candidates, lock the pick ──► first free room
//!                                                                   │
//!            notify ◄── commit ◄── insert Pending (expires_at) ◄── price
//! ```
//!
//! The room pick and the insert share one transaction, so two concurrent
//! requests cannot both take the same room for overlapping nights.

use crate::availability;
use crate::code;
use crate::environment::HotelEnvironment;
use crate::error::{HotelError, Result, StoreError};
use crate::notify::{self, Notification};
use crate::pricing::{self, Totals};
use crate::stay::StayWindow;
use crate::types::{
    Actor, Reservation, ReservationFilter, ReservationId, ReservationStatus, Room, RoomType,
    RoomTypeId, UserId,
};
use tracing::{info, instrument};

/// Request to place a hold.
#[derive(Clone, Debug)]
pub struct CreateReservation {
    /// Guest placing the hold
    pub guest_id: UserId,
    /// Requested room type
    pub room_type_id: RoomTypeId,
    /// Requested dates
    pub stay: StayWindow,
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
}

/// Rejects occupancy the room type cannot take.
pub(crate) fn check_occupancy(room_type: &RoomType, adults: u32, children: u32) -> Result<()> {
    if adults == 0 {
        return Err(HotelError::validation("adults must be at least 1"));
    }
    if adults > room_type.max_adults {
        return Err(HotelError::validation(format!(
            "adults exceeds the maximum of {} for {}",
            room_type.max_adults, room_type.name
        )));
    }
    if children > room_type.max_children {
        return Err(HotelError::validation(format!(
            "children exceeds the maximum of {} for {}",
            room_type.max_children, room_type.name
        )));
    }
    Ok(())
}

/// Creates, lists, cancels and expires reservations.
#[derive(Clone, Debug)]
pub struct ReservationManager {
    env: HotelEnvironment,
}

impl ReservationManager {
    /// Creates a manager over the given environment.
    #[must_use]
    pub const fn new(env: HotelEnvironment) -> Self {
        Self { env }
    }

    /// Places a pending hold on the first available room of the type.
    ///
    /// # Errors
    ///
    /// - [`HotelError::Validation`] for bad occupancy
    /// - [`HotelError::NotFound`] for an unknown room type
    /// - [`HotelError::NoAvailability`] when every room is taken
    #[instrument(
        skip(self, request),
        fields(guest_id = %request.guest_id, room_type_id = %request.room_type_id)
    )]
    pub async fn create(&self, request: CreateReservation) -> Result<Reservation> {
        if request.adults == 0 {
            return Err(HotelError::validation("adults must be at least 1"));
        }
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;

        let room_type = tx
            .room_type(request.room_type_id)
            .await?
            .ok_or_else(|| HotelError::not_found("Room type", request.room_type_id))?;
        check_occupancy(&room_type, request.adults, request.children)?;

        let picked = availability::first_available_room(&mut *tx, room_type.id, request.stay, now)
            .await
            .map_err(|e| match e {
                HotelError::Store(StoreError::Conflict(detail)) => {
                    metrics::counter!("hotel.reservations.rejected").increment(1);
                    tracing::warn!(%detail, "Room pick lost to a concurrent writer");
                    HotelError::NoAvailability(format!(
                        "a {} room was claimed concurrently, please retry",
                        room_type.name
                    ))
                }
                other => other,
            })?;
        let Some(room) = picked else {
            metrics::counter!("hotel.reservations.rejected").increment(1);
            return Err(HotelError::NoAvailability(format!(
                "no {} room is free from {} to {}",
                room_type.name,
                request.stay.check_in().date_naive(),
                request.stay.check_out().date_naive()
            )));
        };

        let line = pricing::quote_room(&room_type, room.id, &request.stay)?;
        let totals = Totals::from_lines(&[line])?;

        let reservation = Reservation {
            id: ReservationId::new(),
            code: code::generate(code::RESERVATION_PREFIX, now),
            guest_id: request.guest_id,
            room_type_id: room_type.id,
            stay: request.stay,
            adults: request.adults,
            children: request.children,
            room: line,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            status: ReservationStatus::Pending,
            expires_at: now + self.env.hold_duration,
            created_at: now,
        };

        // Lapsed holds still carry `pending` on disk; clear them so the
        // storage-level overlap rule agrees with lazy expiry.
        tx.expire_stale_holds_on_room(room.id, now).await?;
        tx.insert_reservation(reservation.clone())
            .await
            .map_err(|e| no_availability_on_conflict(e, &room))?;
        tx.commit()
            .await
            .map_err(|e| no_availability_on_conflict(e, &room))?;

        metrics::counter!("hotel.reservations.created").increment(1);
        info!(
            reservation_id = %reservation.id,
            code = %reservation.code,
            room_id = %room.id,
            expires_at = %reservation.expires_at,
            "Reservation created"
        );

        notify::publish_all(
            self.env.notifier.as_ref(),
            vec![Notification::ReservationCreated {
                guest_id: reservation.guest_id,
                reservation_id: reservation.id,
                code: reservation.code.clone(),
            }],
        )
        .await;

        Ok(reservation)
    }

    /// Available rooms of a type for a stay.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::NotFound`] for an unknown room type.
    #[instrument(skip(self))]
    pub async fn available_rooms(
        &self,
        room_type_id: RoomTypeId,
        stay: StayWindow,
    ) -> Result<Vec<Room>> {
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;
        if tx.room_type(room_type_id).await?.is_none() {
            return Err(HotelError::not_found("Room type", room_type_id));
        }
        // Plain reads only; the transaction is dropped unused.
        availability::available_rooms(&mut *tx, room_type_id, stay, now).await
    }

    /// One reservation, visible to its owner and to staff.
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] or [`HotelError::Forbidden`].
    pub async fn get(&self, actor: Actor, id: ReservationId) -> Result<Reservation> {
        let reservation = self
            .env
            .store
            .reservation(id)
            .await?
            .ok_or_else(|| HotelError::not_found("Reservation", id))?;
        if !actor.may_access(reservation.guest_id) {
            return Err(HotelError::Forbidden(
                "You can only view your own reservations".to_string(),
            ));
        }
        Ok(reservation.with_lazy_expiry(self.env.clock.now()))
    }

    /// The guest's own reservations, newest first, lazily expired.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn my_reservations(&self, guest_id: UserId) -> Result<Vec<Reservation>> {
        self.list(ReservationFilter {
            guest_id: Some(guest_id),
            status: None,
        })
        .await
    }

    /// Reservations matching a filter, newest first, lazily expired.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list(&self, filter: ReservationFilter) -> Result<Vec<Reservation>> {
        let now = self.env.clock.now();
        let rows = self.env.store.list_reservations(filter, now).await?;
        Ok(rows
            .into_iter()
            .map(|r| r.with_lazy_expiry(now))
            .collect())
    }

    /// Cancels a pending hold. Owners may cancel their own; staff any.
    ///
    /// # Errors
    ///
    /// - [`HotelError::NotFound`] / [`HotelError::Forbidden`]
    /// - [`HotelError::InvalidTransition`] unless the hold is still pending
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn cancel(&self, actor: Actor, id: ReservationId) -> Result<Reservation> {
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;
        let mut reservation = tx
            .reservation(id)
            .await?
            .ok_or_else(|| HotelError::not_found("Reservation", id))?;
        if !actor.may_access(reservation.guest_id) {
            return Err(HotelError::Forbidden(
                "You can only cancel your own reservations".to_string(),
            ));
        }

        let current = reservation.effective_status(now);
        if current != ReservationStatus::Pending {
            return Err(HotelError::InvalidTransition {
                entity: "reservation",
                from: current.to_string(),
                to: ReservationStatus::Cancelled.to_string(),
            });
        }
        reservation.status = current.transition(ReservationStatus::Cancelled)?;
        tx.set_reservation_status(id, reservation.status).await?;
        tx.commit().await?;

        metrics::counter!("hotel.reservations.cancelled").increment(1);
        info!(reservation_id = %id, "Reservation cancelled");

        notify::publish_all(
            self.env.notifier.as_ref(),
            vec![Notification::ReservationCancelled {
                guest_id: reservation.guest_id,
                reservation_id: id,
            }],
        )
        .await;

        Ok(reservation)
    }

    /// Staff override of a reservation's status, checked against the
    /// state machine from the effective status.
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] or [`HotelError::InvalidTransition`].
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;
        let mut reservation = tx
            .reservation(id)
            .await?
            .ok_or_else(|| HotelError::not_found("Reservation", id))?;

        let from = reservation.effective_status(now);
        reservation.status = from.transition(status)?;
        tx.set_reservation_status(id, reservation.status).await?;
        tx.commit().await?;

        info!(reservation_id = %id, %from, to = %reservation.status, "Reservation status changed");
        Ok(reservation)
    }

    /// Persists lazy expiry for every lapsed hold. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn expire_stale(&self) -> Result<u64> {
        let expired = self
            .env
            .store
            .expire_stale_reservations(self.env.clock.now())
            .await?;
        if expired > 0 {
            metrics::counter!("hotel.reservations.expired").increment(expired);
            info!(expired, "Expired stale reservations");
        }
        Ok(expired)
    }
}

fn no_availability_on_conflict(error: StoreError, room: &Room) -> HotelError {
    match error {
        StoreError::Conflict(detail) => {
            metrics::counter!("hotel.reservations.rejected").increment(1);
            tracing::warn!(room_id = %room.id, %detail, "Hold rejected by storage overlap rule");
            HotelError::NoAvailability(format!("room {} was taken concurrently", room.number))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::money::Money;

    fn standard() -> RoomType {
        RoomType {
            id: RoomTypeId::new(),
            name: "Standard".to_string(),
            description: String::new(),
            base_price: Money::from_cents(8_000),
            max_adults: 2,
            max_children: 1,
            discount_percent: 0,
            amenities: vec![],
        }
    }

    #[test]
    fn occupancy_limits() {
        let room_type = standard();
        assert!(check_occupancy(&room_type, 2, 1).is_ok());
        assert!(check_occupancy(&room_type, 0, 0).is_err());
        assert!(check_occupancy(&room_type, 3, 0).is_err());
        let err = check_occupancy(&room_type, 1, 2).unwrap_err();
        assert!(err.to_string().contains("children"));
    }
}
