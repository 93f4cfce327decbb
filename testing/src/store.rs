//! In-memory [`HotelStore`] for fast, deterministic tests.
//!
//! Transactions are fully serialized: `begin` takes the single table lock
//! and works on a private copy of every table. `commit` writes the copy
//! back; dropping the transaction discards it. Concurrent managers
//! therefore observe each other's writes exactly as they would under
//! serializable isolation.

use hotel_core::error::StoreError;
use hotel_core::stay::StayWindow;
use hotel_core::store::{HotelStore, StoreFuture, StoreTransaction};
use hotel_core::{
    Booking, BookingFilter, BookingId, BookingStatus, Page, Paged, Payment, PaymentId,
    PaymentStatus, Reservation, ReservationFilter, ReservationId, ReservationStatus, Room, RoomId,
    RoomStatus, RoomType, RoomTypeId, Session,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Copy of every table, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    /// Room types
    pub room_types: Vec<RoomType>,
    /// Rooms
    pub rooms: Vec<Room>,
    /// Reservations
    pub reservations: Vec<Reservation>,
    /// Bookings
    pub bookings: Vec<Booking>,
    /// Payments
    pub payments: Vec<Payment>,
    /// Sessions
    pub sessions: Vec<Session>,
}

impl Snapshot {
    /// Room by id.
    #[must_use]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Reservation by id.
    #[must_use]
    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Booking by id.
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Payment by id.
    #[must_use]
    pub fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == id)
    }

    fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == id)
    }
}

/// In-memory store.
///
/// # Example
///
/// ```
/// use hotel_testing::InMemoryStore;
/// use hotel_core::HotelStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStore::new();
/// let tx = store.begin().await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Snapshot>>,
    fail_next_commit: Arc<AtomicBool>,
    fail_next_lock: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a room type to the catalog.
    pub async fn insert_room_type(&self, room_type: RoomType) {
        self.tables.lock().await.room_types.push(room_type);
    }

    /// Adds a physical room.
    pub async fn insert_room(&self, room: Room) {
        self.tables.lock().await.rooms.push(room);
    }

    /// Adds a bearer session.
    pub async fn insert_session(&self, session: Session) {
        self.tables.lock().await.sessions.push(session);
    }

    /// Forces a room's live status, bypassing any transaction.
    pub async fn force_room_status(&self, id: RoomId, status: RoomStatus) {
        if let Some(room) = self.tables.lock().await.room_mut(id) {
            room.status = status;
        }
    }

    /// Makes the next `commit` fail with a database error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Makes the next `lock_room` fail as if the database had aborted the
    /// transaction to break a deadlock.
    pub fn fail_next_lock(&self) {
        self.fail_next_lock.store(true, Ordering::SeqCst);
    }

    /// Copy of every table as last committed.
    pub async fn snapshot(&self) -> Snapshot {
        self.tables.lock().await.clone()
    }
}

impl HotelStore for InMemoryStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.tables).lock_owned().await;
            let working = guard.clone();
            let tx: Box<dyn StoreTransaction> = Box::new(InMemoryTransaction {
                guard,
                working,
                fail_commit: Arc::clone(&self.fail_next_commit),
                fail_lock: Arc::clone(&self.fail_next_lock),
            });
            Ok(tx)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn room_type(&self, id: RoomTypeId) -> StoreFuture<'_, Option<RoomType>> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            Ok(tables.room_types.iter().find(|t| t.id == id).cloned())
        })
    }

    fn room(&self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        Box::pin(async move { Ok(self.tables.lock().await.room(id).cloned()) })
    }

    fn reservation(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move { Ok(self.tables.lock().await.reservation(id).cloned()) })
    }

    fn booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move { Ok(self.tables.lock().await.booking(id).cloned()) })
    }

    fn payment(&self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        Box::pin(async move { Ok(self.tables.lock().await.payment(id).cloned()) })
    }

    fn list_reservations(
        &self,
        filter: ReservationFilter,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            let mut rows: Vec<Reservation> = tables
                .reservations
                .iter()
                .filter(|r| filter.guest_id.is_none_or(|g| r.guest_id == g))
                .filter(|r| filter.status.is_none_or(|s| r.effective_status(now) == s))
                .cloned()
                .collect();
            rows.reverse();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        })
    }

    fn list_bookings(&self, filter: BookingFilter, page: Page) -> StoreFuture<'_, Paged<Booking>> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            let mut rows: Vec<&Booking> = tables
                .bookings
                .iter()
                .filter(|b| filter.guest_id.is_none_or(|g| b.guest_id == g))
                .filter(|b| filter.status.is_none_or(|s| b.status == s))
                .collect();
            rows.reverse();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = rows.len() as u64;
            let items = rows
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.limit as usize)
                .cloned()
                .collect();
            Ok(Paged { items, total, page })
        })
    }

    fn session(&self, token: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, Option<Session>> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            Ok(tables
                .sessions
                .iter()
                .find(|s| s.token == token && s.expires_at > now)
                .cloned())
        })
    }

    fn expire_stale_reservations(&self, now: DateTime<Utc>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            Ok(expire_where(&mut tables.reservations, now, |_| true))
        })
    }
}

fn expire_where(
    reservations: &mut [Reservation],
    now: DateTime<Utc>,
    also: impl Fn(&Reservation) -> bool,
) -> u64 {
    let mut changed = 0;
    for reservation in reservations.iter_mut() {
        if reservation.status == ReservationStatus::Pending
            && reservation.expires_at <= now
            && also(reservation)
        {
            reservation.status = ReservationStatus::Expired;
            changed += 1;
        }
    }
    changed
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Snapshot>,
    working: Snapshot,
    fail_commit: Arc<AtomicBool>,
    fail_lock: Arc<AtomicBool>,
}

impl StoreTransaction for InMemoryTransaction {
    fn room_type(&mut self, id: RoomTypeId) -> StoreFuture<'_, Option<RoomType>> {
        let found = self.working.room_types.iter().find(|t| t.id == id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        let found = self.working.room(id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn lock_room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        if self.fail_lock.swap(false, Ordering::SeqCst) {
            return Box::pin(async move {
                Err(StoreError::Conflict(format!("deadlock detected locking room {id}")))
            });
        }
        // The whole store is already locked.
        self.room(id)
    }

    fn rooms_of_type(&mut self, room_type_id: RoomTypeId) -> StoreFuture<'_, Vec<Room>> {
        let rooms = self
            .working
            .rooms
            .iter()
            .filter(|r| r.room_type_id == room_type_id && r.status != RoomStatus::Maintenance)
            .cloned()
            .collect();
        Box::pin(async move { Ok(rooms) })
    }

    fn reservation(&mut self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        let found = self.working.reservation(id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn booking(&mut self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        let found = self.working.booking(id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn payment(&mut self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        let found = self.working.payment(id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn overlapping_reservations(
        &mut self,
        room_id: RoomId,
        stay: StayWindow,
        exclude: Option<ReservationId>,
    ) -> StoreFuture<'_, Vec<Reservation>> {
        let rows = self
            .working
            .reservations
            .iter()
            .filter(|r| {
                r.room.room_id == room_id
                    && r.status.is_active()
                    && Some(r.id) != exclude
                    && r.stay.overlaps(&stay)
            })
            .cloned()
            .collect();
        Box::pin(async move { Ok(rows) })
    }

    fn overlapping_bookings(
        &mut self,
        room_id: RoomId,
        stay: StayWindow,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        let rows = self
            .working
            .bookings
            .iter()
            .filter(|b| {
                b.status.is_active()
                    && Some(b.id) != exclude
                    && b.rooms.iter().any(|l| l.room_id == room_id)
                    && b.stay.overlaps(&stay)
            })
            .cloned()
            .collect();
        Box::pin(async move { Ok(rows) })
    }

    fn active_bookings_on_room(
        &mut self,
        room_id: RoomId,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        let rows = self
            .working
            .bookings
            .iter()
            .filter(|b| {
                b.status.is_active()
                    && Some(b.id) != exclude
                    && b.rooms.iter().any(|l| l.room_id == room_id)
            })
            .cloned()
            .collect();
        Box::pin(async move { Ok(rows) })
    }

    fn expire_stale_holds_on_room(
        &mut self,
        room_id: RoomId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, u64> {
        let changed = expire_where(&mut self.working.reservations, now, |r| {
            r.room.room_id == room_id
        });
        Box::pin(async move { Ok(changed) })
    }

    fn insert_reservation(&mut self, reservation: Reservation) -> StoreFuture<'_, ()> {
        // Mirrors the exclusion constraint on (room, stay) for active holds.
        let clash = self.working.reservations.iter().any(|r| {
            r.status.is_active()
                && r.room.room_id == reservation.room.room_id
                && r.stay.overlaps(&reservation.stay)
        });
        let result = if clash {
            Err(StoreError::Conflict(format!(
                "overlapping hold on room {}",
                reservation.room.room_id
            )))
        } else {
            self.working.reservations.push(reservation);
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn insert_booking(&mut self, booking: Booking) -> StoreFuture<'_, ()> {
        self.working.bookings.push(booking);
        Box::pin(async move { Ok(()) })
    }

    fn insert_payment(&mut self, payment: Payment) -> StoreFuture<'_, ()> {
        self.working.payments.push(payment);
        Box::pin(async move { Ok(()) })
    }

    fn set_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> StoreFuture<'_, ()> {
        if let Some(r) = self.working.reservations.iter_mut().find(|r| r.id == id) {
            r.status = status;
        }
        Box::pin(async move { Ok(()) })
    }

    fn set_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        if let Some(b) = self.working.bookings.iter_mut().find(|b| b.id == id) {
            b.status = status;
            b.updated_at = updated_at;
        }
        Box::pin(async move { Ok(()) })
    }

    fn set_booking_payment(
        &mut self,
        id: BookingId,
        payment_id: PaymentId,
    ) -> StoreFuture<'_, ()> {
        if let Some(b) = self.working.bookings.iter_mut().find(|b| b.id == id) {
            b.payment_id = Some(payment_id);
        }
        Box::pin(async move { Ok(()) })
    }

    fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreFuture<'_, ()> {
        if let Some(p) = self.working.payments.iter_mut().find(|p| p.id == id) {
            p.status = status;
            p.completed_at = completed_at;
        }
        Box::pin(async move { Ok(()) })
    }

    fn set_room_status(&mut self, ids: Vec<RoomId>, status: RoomStatus) -> StoreFuture<'_, ()> {
        for room in &mut self.working.rooms {
            if ids.contains(&room.id) {
                room.status = status;
            }
        }
        Box::pin(async move { Ok(()) })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            let Self {
                mut guard,
                working,
                fail_commit,
                ..
            } = *self;
            if fail_commit.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Database("injected commit failure".to_string()));
            }
            *guard = working;
            Ok(())
        })
    }
}
