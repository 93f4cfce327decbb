//! [`StoreTransaction`] over a sqlx transaction.

use crate::rows::{
    self, BookingRow, PaymentRow, ReservationRow, RoomRow, RoomTypeRow, db_cents, db_count,
};
use crate::{
    ROOM_TYPE_SELECT, booking_select, payment_select, reservation_select, room_select,
    store_error,
};
use chrono::{DateTime, Utc};
use hotel_core::store::StoreFuture;
use hotel_core::{
    Booking, BookingId, BookingStatus, Payment, PaymentId, PaymentStatus, Reservation,
    ReservationId, ReservationStatus, Room, RoomId, RoomStatus, RoomType, RoomTypeId,
    StayWindow, StoreTransaction,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Open `PostgreSQL` transaction. Dropping it without committing rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTransaction {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction").finish_non_exhaustive()
    }
}

impl StoreTransaction for PgTransaction {
    fn room_type(&mut self, id: RoomTypeId) -> StoreFuture<'_, Option<RoomType>> {
        Box::pin(async move {
            let row: Option<RoomTypeRow> = sqlx::query_as(ROOM_TYPE_SELECT)
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to load room type", &e))?;
            rows::optional(row)
        })
    }

    fn room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        Box::pin(async move {
            let row: Option<RoomRow> = sqlx::query_as(room_select!("WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to load room", &e))?;
            rows::optional(row)
        })
    }

    fn lock_room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        Box::pin(async move {
            let row: Option<RoomRow> = sqlx::query_as(room_select!("WHERE id = $1 FOR UPDATE"))
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to lock room", &e))?;
            rows::optional(row)
        })
    }

    fn rooms_of_type(&mut self, room_type_id: RoomTypeId) -> StoreFuture<'_, Vec<Room>> {
        Box::pin(async move {
            let rows: Vec<RoomRow> = sqlx::query_as(room_select!(
                "WHERE room_type_id = $1 AND status <> 'maintenance' ORDER BY created_at, id"
            ))
            .bind(room_type_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to list rooms", &e))?;
            rows::all(rows)
        })
    }

    fn reservation(&mut self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move {
            let row: Option<ReservationRow> =
                sqlx::query_as(reservation_select!("WHERE id = $1 FOR UPDATE"))
                    .bind(id.as_uuid())
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err(|e| store_error("Failed to lock reservation", &e))?;
            rows::optional(row)
        })
    }

    fn booking(&mut self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row: Option<BookingRow> =
                sqlx::query_as(booking_select!("WHERE b.id = $1 FOR UPDATE OF b"))
                    .bind(id.as_uuid())
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err(|e| store_error("Failed to lock booking", &e))?;
            rows::optional(row)
        })
    }

    fn payment(&mut self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        Box::pin(async move {
            let row: Option<PaymentRow> =
                sqlx::query_as(payment_select!("WHERE id = $1 FOR UPDATE"))
                    .bind(id.as_uuid())
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err(|e| store_error("Failed to lock payment", &e))?;
            rows::optional(row)
        })
    }

    fn overlapping_reservations(
        &mut self,
        room_id: RoomId,
        stay: StayWindow,
        exclude: Option<ReservationId>,
    ) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let rows: Vec<ReservationRow> = sqlx::query_as(reservation_select!(
                "WHERE room_id = $1 \
                 AND status IN ('pending', 'confirmed') \
                 AND check_in < $3 AND check_out > $2 \
                 AND ($4::uuid IS NULL OR id <> $4) \
                 ORDER BY created_at"
            ))
            .bind(room_id.as_uuid())
            .bind(stay.check_in())
            .bind(stay.check_out())
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to query overlapping reservations", &e))?;
            rows::all(rows)
        })
    }

    fn overlapping_bookings(
        &mut self,
        room_id: RoomId,
        stay: StayWindow,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows: Vec<BookingRow> = sqlx::query_as(booking_select!(
                "WHERE b.status IN ('pending_payment', 'confirmed', 'confirmed_unpaid', 'checked_in') \
                 AND b.check_in < $3 AND b.check_out > $2 \
                 AND EXISTS (SELECT 1 FROM booking_rooms r \
                             WHERE r.booking_id = b.id AND r.room_id = $1) \
                 AND ($4::uuid IS NULL OR b.id <> $4) \
                 ORDER BY b.created_at"
            ))
            .bind(room_id.as_uuid())
            .bind(stay.check_in())
            .bind(stay.check_out())
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to query overlapping bookings", &e))?;
            rows::all(rows)
        })
    }

    fn active_bookings_on_room(
        &mut self,
        room_id: RoomId,
        exclude: Option<BookingId>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows: Vec<BookingRow> = sqlx::query_as(booking_select!(
                "WHERE b.status IN ('pending_payment', 'confirmed', 'confirmed_unpaid', 'checked_in') \
                 AND EXISTS (SELECT 1 FROM booking_rooms r \
                             WHERE r.booking_id = b.id AND r.room_id = $1) \
                 AND ($2::uuid IS NULL OR b.id <> $2) \
                 ORDER BY b.created_at"
            ))
            .bind(room_id.as_uuid())
            .bind(exclude.map(|id| *id.as_uuid()))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to query bookings on room", &e))?;
            rows::all(rows)
        })
    }

    fn expire_stale_holds_on_room(
        &mut self,
        room_id: RoomId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE reservations SET status = 'expired' \
                 WHERE room_id = $1 AND status = 'pending' AND expires_at <= $2",
            )
            .bind(room_id.as_uuid())
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to expire holds", &e))?;
            Ok(result.rows_affected())
        })
    }

    fn insert_reservation(&mut self, reservation: Reservation) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO reservations (id, code, guest_id, room_type_id, room_id, check_in, \
                 check_out, adults, children, price_per_night_cents, nights, line_subtotal_cents, \
                 subtotal_cents, tax_cents, total_cents, status, expires_at, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
            )
            .bind(reservation.id.as_uuid())
            .bind(&reservation.code)
            .bind(reservation.guest_id.as_uuid())
            .bind(reservation.room_type_id.as_uuid())
            .bind(reservation.room.room_id.as_uuid())
            .bind(reservation.stay.check_in())
            .bind(reservation.stay.check_out())
            .bind(db_count(reservation.adults)?)
            .bind(db_count(reservation.children)?)
            .bind(db_cents(reservation.room.price_per_night)?)
            .bind(db_count(reservation.room.nights)?)
            .bind(db_cents(reservation.room.subtotal)?)
            .bind(db_cents(reservation.subtotal)?)
            .bind(db_cents(reservation.tax)?)
            .bind(db_cents(reservation.total)?)
            .bind(reservation.status.as_str())
            .bind(reservation.expires_at)
            .bind(reservation.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to insert reservation", &e))?;
            Ok(())
        })
    }

    fn insert_booking(&mut self, booking: Booking) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO bookings (id, code, reservation_id, guest_id, check_in, check_out, \
                 adults, children, subtotal_cents, tax_cents, total_cents, status, payment_method, \
                 payment_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            )
            .bind(booking.id.as_uuid())
            .bind(&booking.code)
            .bind(booking.reservation_id.map(|id| *id.as_uuid()))
            .bind(booking.guest_id.as_uuid())
            .bind(booking.stay.check_in())
            .bind(booking.stay.check_out())
            .bind(db_count(booking.adults)?)
            .bind(db_count(booking.children)?)
            .bind(db_cents(booking.subtotal)?)
            .bind(db_cents(booking.tax)?)
            .bind(db_cents(booking.total)?)
            .bind(booking.status.as_str())
            .bind(booking.payment_method.as_str())
            // payments.booking_id references this row; set_booking_payment links it.
            .bind(Option::<Uuid>::None)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to insert booking", &e))?;

            for (position, line) in booking.rooms.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO booking_rooms (booking_id, room_id, position, \
                     price_per_night_cents, nights, subtotal_cents) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(booking.id.as_uuid())
                .bind(line.room_id.as_uuid())
                .bind(i32::try_from(position).unwrap_or(i32::MAX))
                .bind(db_cents(line.price_per_night)?)
                .bind(db_count(line.nights)?)
                .bind(db_cents(line.subtotal)?)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to insert booking room", &e))?;
            }

            Ok(())
        })
    }

    fn insert_payment(&mut self, payment: Payment) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO payments (id, booking_id, guest_id, amount_cents, method, status, \
                 created_at, completed_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(payment.id.as_uuid())
            .bind(payment.booking_id.as_uuid())
            .bind(payment.guest_id.as_uuid())
            .bind(db_cents(payment.amount)?)
            .bind(payment.method.as_str())
            .bind(payment.status.as_str())
            .bind(payment.created_at)
            .bind(payment.completed_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to insert payment", &e))?;
            Ok(())
        })
    }

    fn set_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(status.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to update reservation status", &e))?;
            Ok(())
        })
    }

    fn set_booking_status(
        &mut self,
        id: BookingId,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(status.as_str())
                .bind(updated_at)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to update booking status", &e))?;
            Ok(())
        })
    }

    fn set_booking_payment(
        &mut self,
        id: BookingId,
        payment_id: PaymentId,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE bookings SET payment_id = $2 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(payment_id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to link payment", &e))?;
            Ok(())
        })
    }

    fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE payments SET status = $2, completed_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(status.as_str())
                .bind(completed_at)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to update payment status", &e))?;
            Ok(())
        })
    }

    fn set_room_status(&mut self, ids: Vec<RoomId>, status: RoomStatus) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
            sqlx::query("UPDATE rooms SET status = $2 WHERE id = ANY($1)")
                .bind(&ids)
                .bind(status.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| store_error("Failed to update room status", &e))?;
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.tx
                .commit()
                .await
                .map_err(|e| store_error("Failed to commit transaction", &e))
        })
    }
}
