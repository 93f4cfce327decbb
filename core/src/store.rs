//! Storage abstraction for rooms, reservations, bookings and payments.
//!
//! # Design
//!
//! Every write the managers perform goes through a [`StoreTransaction`]:
//! the availability check, the room pick and the writes that depend on it
//! commit or roll back together. A transaction that is dropped without
//! [`StoreTransaction::commit`] rolls back.
//!
//! Reads that need no isolation (listings, session lookups, single-entity
//! fetches for the HTTP layer) live directly on [`HotelStore`], as does the
//! bulk expiry sweep.
//!
//! # Implementations
//!
//! - `PgStore` (in `hotel-postgres`): `PostgreSQL` transactions with row
//!   locks and an exclusion constraint on overlapping holds
//! - `InMemoryStore` (in `hotel-testing`): serialized transactions over a
//!   copy-on-begin working set
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` so the managers can hold an
//! `Arc<dyn HotelStore>`.

use crate::error::StoreError;
use crate::stay::StayWindow;
use crate::types::{
    Booking, BookingFilter, BookingId, BookingStatus, Page, Paged, Payment, PaymentId,
    PaymentStatus, Reservation, ReservationFilter, ReservationId, ReservationStatus, Room,
    RoomId, RoomStatus, RoomType, RoomTypeId, Session,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Entry point to persistent state.
pub trait HotelStore: Send + Sync {
    /// Opens a transaction.
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>>;

    /// Cheap connectivity check for readiness probes.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Room type by id.
    fn room_type(&self, id: RoomTypeId) -> StoreFuture<'_, Option<RoomType>>;

    /// Room by id.
    fn room(&self, id: RoomId) -> StoreFuture<'_, Option<Room>>;

    /// Reservation by id, as persisted (no lazy expiry applied).
    fn reservation(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>>;

    /// Booking by id.
    fn booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Payment by id.
    fn payment(&self, id: PaymentId) -> StoreFuture<'_, Option<Payment>>;

    /// Reservations matching `filter`, newest first.
    ///
    /// A status filter matches the status effective at `now`, so a pending
    /// hold past its deadline is returned for `Expired` and not for
    /// `Pending`.
    fn list_reservations(
        &self,
        filter: ReservationFilter,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Reservation>>;

    /// One page of bookings matching `filter`, newest first.
    fn list_bookings(&self, filter: BookingFilter, page: Page) -> StoreFuture<'_, Paged<Booking>>;

    /// Session behind a bearer token, if it exists and has not expired.
    fn session(&self, token: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, Option<Session>>;

    /// Moves every pending reservation with `expires_at <= now` to expired
    /// in one conditional update. Returns the number of rows changed.
    fn expire_stale_reservations(&self, now: DateTime<Utc>) -> StoreFuture<'_, u64>;
}

/// One atomic unit of work.
pub trait StoreTransaction: Send {
    /// Room type by id.
    fn room_type(&mut self, id: RoomTypeId) -> StoreFuture<'_, Option<RoomType>>;

    /// Room by id without locking.
    fn room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>>;

    /// Room by id, locked until the transaction ends.
    fn lock_room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>>;

    /// Non-maintenance rooms of a type, in natural order.
    fn rooms_of_type(&mut self, room_type_id: RoomTypeId) -> StoreFuture<'_, Vec<Room>>;

    /// Reservation by id, locked until the transaction ends.
    fn reservation(&mut self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>>;

    /// Booking by id, locked until the transaction ends.
    fn booking(&mut self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Payment by id, locked until the transaction ends.
    fn payment(&mut self, id: PaymentId) -> StoreFuture<'_, Option<Payment>>;

    /// Pending or confirmed reservations on `room_id` whose window overlaps
    /// `stay`, skipping `exclude`. Deadlines are not evaluated here.
    fn overlapping_reservations(
        &mut self,
        room_id: RoomId,
        stay: StayWindow,
        exclude: Option<ReservationId>,
    ) -> StoreFuture<'_, Vec<Reservation>>;

    /// Active bookings (`pending_payment`, `confirmed`, `confirmed_unpaid`,
    /// `checked_in`) with a line on `room_id` overlapping `stay`, skipping
    /// `exclude`.
    fn overlapping_bookings(
        &mut self,
        room_id: RoomId,
        stay: StayWindow,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Vec<Booking>>;

    /// Every active booking with a line on `room_id`, whatever its dates,
    /// skipping `exclude`.
    fn active_bookings_on_room(
        &mut self,
        room_id: RoomId,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Vec<Booking>>;

    /// Expires stale pending holds on one room. Returns the rows changed.
    fn expire_stale_holds_on_room(
        &mut self,
        room_id: RoomId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, u64>;

    /// Inserts a new reservation.
    fn insert_reservation(&mut self, reservation: Reservation) -> StoreFuture<'_, ()>;

    /// Inserts a new booking with its room lines.
    fn insert_booking(&mut self, booking: Booking) -> StoreFuture<'_, ()>;

    /// Inserts a new payment.
    fn insert_payment(&mut self, payment: Payment) -> StoreFuture<'_, ()>;

    /// Overwrites a reservation's status.
    fn set_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> StoreFuture<'_, ()>;

    /// Overwrites a booking's status and `updated_at`.
    fn set_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Links a booking to its payment.
    fn set_booking_payment(&mut self, id: BookingId, payment_id: PaymentId)
    -> StoreFuture<'_, ()>;

    /// Overwrites a payment's status and completion time.
    fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreFuture<'_, ()>;

    /// Sets the status of every listed room in one update.
    fn set_room_status(&mut self, ids: Vec<RoomId>, status: RoomStatus) -> StoreFuture<'_, ()>;

    /// Makes every write visible atomically.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;
}
