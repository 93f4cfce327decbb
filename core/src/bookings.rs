//! Booking manager: converts holds (or walk-in requests) into firm,
//! payment-backed bookings and drives them through check-in/check-out.
//!
//! # Commit sequence
//!
//! ```text
//! price re-check ─► begin ─► lock + re-check every room ─► validate hold
//!                                                               │
//!   notify ◄─ commit ◄─ reservation → confirmed ◄─ room status ◄┘
//!                         ▲
//!           booking + payment + payment link
//! ```
//!
//! Both checks run before the first write, and every write shares one
//! transaction: a rejected request leaves no booking, no payment and no
//! room status change behind.

use crate::availability::{self, Exclusions, Unavailable};
use crate::code;
use crate::environment::HotelEnvironment;
use crate::error::{HotelError, Result, StoreError};
use crate::money::Money;
use crate::notify::{self, Notification};
use crate::pricing::Totals;
use crate::stay::StayWindow;
use crate::store::StoreTransaction;
use crate::types::{
    Actor, Booking, BookingFilter, BookingId, BookingStatus, Page, Paged, Payment, PaymentId,
    PaymentMethod, PaymentStatus, ReservationId, ReservationStatus, RoomId, RoomLine, RoomStatus,
    UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Request to commit a booking.
#[derive(Clone, Debug)]
pub struct CreateBooking {
    /// Guest the booking is for
    pub guest_id: UserId,
    /// Hold being converted, absent for walk-ins
    pub reservation_id: Option<ReservationId>,
    /// Dates
    pub stay: StayWindow,
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
    /// Rooms as quoted to the client
    pub rooms: Vec<RoomLine>,
    /// Client-side subtotal
    pub subtotal: Money,
    /// Client-side tax
    pub tax: Money,
    /// Client-side total, re-verified against the lines
    pub total: Money,
    /// Card (captured now) or Cash (collected later)
    pub payment_method: PaymentMethod,
}

impl CreateBooking {
    fn validate(&self) -> Result<Totals> {
        if self.rooms.is_empty() {
            return Err(HotelError::validation("rooms must not be empty"));
        }
        if self.adults == 0 {
            return Err(HotelError::validation("adults must be at least 1"));
        }
        let nights = self.stay.nights();
        let mut seen = HashSet::with_capacity(self.rooms.len());
        for line in &self.rooms {
            if !seen.insert(line.room_id) {
                return Err(HotelError::validation(format!(
                    "room {} is listed more than once",
                    line.room_id
                )));
            }
            if line.nights != nights {
                return Err(HotelError::validation(format!(
                    "nights for room {} must be {nights}, got {}",
                    line.room_id, line.nights
                )));
            }
        }

        let totals = Totals::from_lines(&self.rooms)?;
        for line in &self.rooms {
            let expected = line
                .price_per_night
                .checked_multiply(line.nights)
                .ok_or_else(|| HotelError::validation("amount out of range"))?;
            if expected != line.subtotal {
                return Err(HotelError::PriceMismatch {
                    expected,
                    submitted: line.subtotal,
                });
            }
        }
        totals.verify_submitted(self.total)?;
        Ok(totals)
    }
}

/// Payment and booking status for a freshly committed booking.
const fn initial_statuses(method: PaymentMethod) -> (BookingStatus, PaymentStatus) {
    match method {
        PaymentMethod::Cash => (BookingStatus::ConfirmedUnpaid, PaymentStatus::Pending),
        PaymentMethod::Card => (BookingStatus::Confirmed, PaymentStatus::Completed),
    }
}

/// Creates bookings and applies lifecycle transitions.
#[derive(Clone, Debug)]
pub struct BookingManager {
    env: HotelEnvironment,
}

impl BookingManager {
    /// Creates a manager over the given environment.
    #[must_use]
    pub const fn new(env: HotelEnvironment) -> Self {
        Self { env }
    }

    /// Commits a booking with its payment in one transaction.
    ///
    /// # Errors
    ///
    /// - [`HotelError::Validation`] for an empty or malformed request, or one
    ///   whose dates or held room line differ from the reservation
    /// - [`HotelError::PriceMismatch`] when the submitted total is stale
    /// - [`HotelError::RoomUnavailable`] when a room was claimed meanwhile
    /// - [`HotelError::NotFound`] for an unknown room or reservation
    /// - [`HotelError::ReservationExpired`] when the hold lapsed
    #[instrument(
        skip(self, request),
        fields(guest_id = %request.guest_id, reservation_id = ?request.reservation_id)
    )]
    pub async fn create(&self, request: CreateBooking) -> Result<Booking> {
        let totals = request.validate().inspect_err(|e| {
            if matches!(e, HotelError::PriceMismatch { .. }) {
                metrics::counter!("hotel.bookings.rejected", "reason" => "price").increment(1);
            }
        })?;
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;

        let exclude = Exclusions {
            reservation: request.reservation_id,
            booking: None,
        };
        let mut room_ids: Vec<RoomId> = request.rooms.iter().map(|l| l.room_id).collect();
        room_ids.sort_unstable();
        for &room_id in &room_ids {
            let verdict = availability::check_room(&mut *tx, room_id, request.stay, exclude, now)
                .await
                .map_err(|e| match e {
                    HotelError::Store(StoreError::Conflict(detail)) => {
                        metrics::counter!("hotel.bookings.rejected", "reason" => "unavailable")
                            .increment(1);
                        warn!(%room_id, %detail, "Room lock lost to a concurrent writer");
                        HotelError::RoomUnavailable {
                            room_id: room_id.to_string(),
                        }
                    }
                    other => other,
                })?;
            match verdict {
                Ok(_) => {}
                Err(Unavailable::UnknownRoom) => {
                    return Err(HotelError::not_found("Room", room_id));
                }
                Err(reason) => {
                    metrics::counter!("hotel.bookings.rejected", "reason" => "unavailable")
                        .increment(1);
                    info!(%room_id, ?reason, "Room failed availability re-check");
                    return Err(HotelError::RoomUnavailable {
                        room_id: room_id.to_string(),
                    });
                }
            }
        }

        if let Some(reservation_id) = request.reservation_id {
            let reservation = tx
                .reservation(reservation_id)
                .await?
                .ok_or_else(|| HotelError::not_found("Reservation", reservation_id))?;
            if reservation.guest_id != request.guest_id {
                return Err(HotelError::Forbidden(
                    "Reservation belongs to another guest".to_string(),
                ));
            }
            if request.stay != reservation.stay {
                return Err(HotelError::validation(format!(
                    "check_in and check_out must match reservation {} ({} to {})",
                    reservation.code,
                    reservation.stay.check_in(),
                    reservation.stay.check_out()
                )));
            }
            if !request.rooms.contains(&reservation.room) {
                return Err(HotelError::validation(format!(
                    "rooms must include room {} exactly as held by reservation {}",
                    reservation.room.room_id, reservation.code
                )));
            }
            if reservation.effective_status(now) != ReservationStatus::Pending {
                metrics::counter!("hotel.bookings.rejected", "reason" => "expired").increment(1);
                return Err(HotelError::ReservationExpired(reservation.code));
            }
        }

        let (status, payment_status) = initial_statuses(request.payment_method);
        let booking_id = BookingId::new();
        let payment = Payment {
            id: PaymentId::new(),
            booking_id,
            guest_id: request.guest_id,
            amount: totals.total,
            method: request.payment_method,
            status: payment_status,
            created_at: now,
            completed_at: (payment_status == PaymentStatus::Completed).then_some(now),
        };
        let mut booking = Booking {
            id: booking_id,
            code: code::generate(code::BOOKING_PREFIX, now),
            reservation_id: request.reservation_id,
            guest_id: request.guest_id,
            stay: request.stay,
            adults: request.adults,
            children: request.children,
            rooms: request.rooms,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            status,
            payment_method: request.payment_method,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };

        tx.insert_booking(booking.clone()).await?;
        tx.insert_payment(payment.clone()).await?;
        tx.set_booking_payment(booking.id, payment.id).await?;
        booking.payment_id = Some(payment.id);
        tx.set_room_status(room_ids, status.room_status_at_creation())
            .await?;
        if let Some(reservation_id) = booking.reservation_id {
            tx.set_reservation_status(
                reservation_id,
                ReservationStatus::Pending.transition(ReservationStatus::Confirmed)?,
            )
            .await?;
        }
        tx.commit().await.map_err(|e| match e {
            StoreError::Conflict(detail) => {
                warn!(%detail, "Booking rejected at commit");
                HotelError::RoomUnavailable {
                    room_id: booking
                        .rooms
                        .first()
                        .map(|l| l.room_id.to_string())
                        .unwrap_or_default(),
                }
            }
            other => other.into(),
        })?;

        metrics::counter!("hotel.bookings.created", "method" => payment.method.as_str())
            .increment(1);
        info!(
            booking_id = %booking.id,
            code = %booking.code,
            status = %booking.status,
            payment_status = %payment.status,
            "Booking created"
        );

        notify::publish_all(
            self.env.notifier.as_ref(),
            vec![Notification::BookingCreated {
                guest_id: booking.guest_id,
                booking_id: booking.id,
                code: booking.code.clone(),
                status: booking.status,
            }],
        )
        .await;

        Ok(booking)
    }

    /// Generic staff status change with its room, payment and reservation
    /// side effects.
    ///
    /// - `checked_in`: rooms become `occupied`
    /// - `checked_out`: rooms become `dirty`, one housekeeping request each
    /// - `cancelled`: rooms still `reserved` and claimed by no other active
    ///   booking return to `available`, the
    ///   payment is refunded (or failed if never collected) and the source
    ///   reservation is cancelled
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] or [`HotelError::InvalidTransition`].
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: BookingId, next: BookingStatus) -> Result<Booking> {
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;
        let mut booking = load_booking(&mut *tx, id).await?;
        let from = booking.status;
        let to = from.transition(next)?;

        let mut notifications = Vec::new();
        match to {
            BookingStatus::CheckedIn => {
                tx.set_room_status(booking.room_ids(), RoomStatus::Occupied)
                    .await?;
            }
            BookingStatus::CheckedOut => {
                tx.set_room_status(booking.room_ids(), RoomStatus::Dirty)
                    .await?;
                notifications.extend(booking.rooms.iter().map(|line| {
                    Notification::HousekeepingRequested {
                        room_id: line.room_id,
                        booking_id: booking.id,
                    }
                }));
            }
            BookingStatus::Cancelled => release(&mut *tx, &booking, now).await?,
            BookingStatus::PendingPayment
            | BookingStatus::Confirmed
            | BookingStatus::ConfirmedUnpaid => {}
        }

        tx.set_booking_status(id, to, now).await?;
        tx.commit().await?;
        booking.status = to;
        booking.updated_at = now;

        metrics::counter!("hotel.bookings.status_changed", "to" => to.as_str()).increment(1);
        info!(booking_id = %id, %from, %to, "Booking status changed");

        notifications.insert(
            0,
            Notification::BookingStatusChanged {
                guest_id: booking.guest_id,
                booking_id: id,
                from,
                to,
            },
        );
        notify::publish_all(self.env.notifier.as_ref(), notifications).await;

        Ok(booking)
    }

    /// Staff records a cash payment: payment `pending → completed` and
    /// booking `confirmed_unpaid → confirmed`.
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] or [`HotelError::InvalidTransition`] when
    /// the booking is not awaiting cash.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, id: BookingId) -> Result<(Booking, Payment)> {
        let now = self.env.clock.now();
        let mut tx = self.env.store.begin().await?;
        let mut booking = load_booking(&mut *tx, id).await?;
        let from = booking.status;
        let to = from.confirm_payment()?;

        let payment_id = booking.payment_id.ok_or_else(|| {
            HotelError::Store(StoreError::Corrupt(format!("booking {id} has no payment")))
        })?;
        let mut payment = tx
            .payment(payment_id)
            .await?
            .ok_or_else(|| HotelError::not_found("Payment", payment_id))?;
        payment.status = payment.status.transition(PaymentStatus::Completed)?;
        payment.completed_at = Some(now);

        tx.set_payment_status(payment_id, payment.status, payment.completed_at)
            .await?;
        tx.set_booking_status(id, to, now).await?;
        tx.commit().await?;
        booking.status = to;
        booking.updated_at = now;

        metrics::counter!("hotel.payments.confirmed").increment(1);
        info!(booking_id = %id, payment_id = %payment_id, "Cash payment confirmed");

        notify::publish_all(
            self.env.notifier.as_ref(),
            vec![
                Notification::PaymentConfirmed {
                    guest_id: booking.guest_id,
                    booking_id: id,
                },
                Notification::BookingStatusChanged {
                    guest_id: booking.guest_id,
                    booking_id: id,
                    from,
                    to,
                },
            ],
        )
        .await;

        Ok((booking, payment))
    }

    /// One booking, visible to its owner and to staff.
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] or [`HotelError::Forbidden`].
    pub async fn get(&self, actor: Actor, id: BookingId) -> Result<Booking> {
        let booking = self
            .env
            .store
            .booking(id)
            .await?
            .ok_or_else(|| HotelError::not_found("Booking", id))?;
        if !actor.may_access(booking.guest_id) {
            return Err(HotelError::Forbidden(
                "You can only view your own bookings".to_string(),
            ));
        }
        Ok(booking)
    }

    /// Payment of a booking, visible to the booking's owner and to staff.
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] or [`HotelError::Forbidden`].
    pub async fn payment(&self, actor: Actor, id: BookingId) -> Result<Payment> {
        let booking = self.get(actor, id).await?;
        let payment_id = booking
            .payment_id
            .ok_or_else(|| HotelError::not_found("Payment for booking", id))?;
        self.env
            .store
            .payment(payment_id)
            .await?
            .ok_or_else(|| HotelError::not_found("Payment", payment_id))
    }

    /// Every booking of a guest, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn my_bookings(&self, guest_id: UserId) -> Result<Vec<Booking>> {
        let filter = BookingFilter {
            guest_id: Some(guest_id),
            status: None,
        };
        let mut page = Page::new(1, Page::MAX_LIMIT);
        let mut all = Vec::new();
        loop {
            let batch = self.env.store.list_bookings(filter, page).await?;
            let done = batch.items.len() < page.limit as usize;
            all.extend(batch.items);
            if done || all.len() as u64 >= batch.total {
                return Ok(all);
            }
            page = Page::new(page.page + 1, page.limit);
        }
    }

    /// One page of bookings for staff.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list(&self, filter: BookingFilter, page: Page) -> Result<Paged<Booking>> {
        Ok(self.env.store.list_bookings(filter, page).await?)
    }
}

/// Undoes a booking's holds on its rooms, payment and source reservation.
async fn release(
    tx: &mut dyn StoreTransaction,
    booking: &Booking,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut room_ids = booking.room_ids();
    room_ids.sort_unstable();
    let mut to_free = Vec::new();
    for room_id in room_ids {
        let Some(room) = tx.lock_room(room_id).await? else {
            continue;
        };
        if room.status != RoomStatus::Reserved {
            continue;
        }
        let others = tx.active_bookings_on_room(room_id, Some(booking.id)).await?;
        if let Some(other) = others.first() {
            info!(%room_id, other_booking = %other.id, "Room stays reserved for another booking");
        } else {
            to_free.push(room_id);
        }
    }
    if !to_free.is_empty() {
        tx.set_room_status(to_free, RoomStatus::Available).await?;
    }

    if let Some(payment_id) = booking.payment_id {
        if let Some(payment) = tx.payment(payment_id).await? {
            if let Some(next) = payment.status.on_booking_cancelled() {
                let next = payment.status.transition(next)?;
                tx.set_payment_status(payment_id, next, payment.completed_at)
                    .await?;
            }
        }
    }

    if let Some(reservation_id) = booking.reservation_id {
        if let Some(reservation) = tx.reservation(reservation_id).await? {
            if reservation.effective_status(now) == ReservationStatus::Confirmed {
                tx.set_reservation_status(reservation_id, ReservationStatus::Cancelled)
                    .await?;
            }
        }
    }
    Ok(())
}

async fn load_booking(tx: &mut dyn StoreTransaction, id: BookingId) -> Result<Booking> {
    tx.booking(id)
        .await?
        .ok_or_else(|| HotelError::not_found("Booking", id))
}
