//! `PostgreSQL` store for the hotel booking service.
//!
//! Implements [`HotelStore`] and [`StoreTransaction`] from `hotel-core` on
//! top of a sqlx connection pool. The schema lives in `migrations/` and is
//! applied with [`PgStore::migrate`].
//!
//! # Concurrency
//!
//! ```text
//!   create reservation / booking
//!   ┌──────────────────────────────────────────────┐
//!   │ BEGIN                                        │
//!   │   SELECT ... FROM rooms ... FOR UPDATE       │  serialize per room
//!   │   overlapping holds / bookings               │
//!   │   INSERT ...                                 │  EXCLUDE gist backstop
//!   │ COMMIT                                       │
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! Two transactions targeting the same room queue on the row lock, so the
//! second one sees the first one's hold once it is allowed to proceed. The
//! `reservations_no_overlap` exclusion constraint rejects any overlapping
//! active hold that slips past the check; that rejection, a serialization
//! failure or a deadlock surfaces as [`StoreError::Conflict`].
//!
//! # Example
//!
//! ```ignore
//! use hotel_postgres::{PgStore, PoolSettings};
//!
//! let store = PgStore::connect(&PoolSettings::new("postgres://localhost/hotel")).await?;
//! store.migrate().await?;
//! ```

mod rows;
mod transaction;

pub use transaction::PgTransaction;

use chrono::{DateTime, Utc};
use hotel_core::{
    Booking, BookingFilter, BookingId, HotelStore, Page, Paged, Payment, PaymentId, Reservation,
    ReservationFilter, ReservationId, Room, RoomId, RoomType, RoomTypeId, Session, StoreError,
    StoreTransaction,
};
use hotel_core::store::StoreFuture;
use rows::{
    BookingRow, PaymentRow, ReservationRow, RoomRow, RoomTypeRow, SessionRow, db_cents, db_count,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// SQL
// ============================================================================

/// `SELECT` over `reservations` followed by the given clause.
macro_rules! reservation_select {
    ($tail:literal) => {
        concat!(
            "SELECT id, code, guest_id, room_type_id, room_id, check_in, check_out, \
             adults, children, price_per_night_cents, nights, line_subtotal_cents, \
             subtotal_cents, tax_cents, total_cents, status, expires_at, created_at \
             FROM reservations ",
            $tail
        )
    };
}

/// `SELECT` over `bookings b` with its room lines aggregated into `lines`,
/// followed by the given clause.
macro_rules! booking_select {
    ($tail:literal) => {
        concat!(
            "SELECT b.id, b.code, b.reservation_id, b.guest_id, b.check_in, b.check_out, \
             b.adults, b.children, b.subtotal_cents, b.tax_cents, b.total_cents, b.status, \
             b.payment_method, b.payment_id, b.created_at, b.updated_at, \
             COALESCE((SELECT json_agg(json_build_object( \
                 'room_id', br.room_id, \
                 'price_per_night_cents', br.price_per_night_cents, \
                 'nights', br.nights, \
                 'subtotal_cents', br.subtotal_cents) ORDER BY br.position) \
               FROM booking_rooms br WHERE br.booking_id = b.id), '[]'::json) AS lines \
             FROM bookings b ",
            $tail
        )
    };
}

/// `SELECT` over `rooms` followed by the given clause.
macro_rules! room_select {
    ($tail:literal) => {
        concat!(
            "SELECT id, number, room_type_id, floor, status FROM rooms ",
            $tail
        )
    };
}

/// `SELECT` over `payments` followed by the given clause.
macro_rules! payment_select {
    ($tail:literal) => {
        concat!(
            "SELECT id, booking_id, guest_id, amount_cents, method, status, created_at, \
             completed_at FROM payments ",
            $tail
        )
    };
}

pub(crate) use booking_select;
pub(crate) use payment_select;
pub(crate) use reservation_select;
pub(crate) use room_select;

const ROOM_TYPE_SELECT: &str = "SELECT id, name, description, base_price_cents, max_adults, \
     max_children, discount_percent, amenities FROM room_types WHERE id = $1";

// ============================================================================
// Errors
// ============================================================================

const EXCLUSION_VIOLATION: &str = "23P01";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Maps a sqlx error, singling out the codes that mean "another writer won".
pub(crate) fn store_error(context: &str, error: &sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = error {
        let code = db.code();
        if matches!(
            code.as_deref(),
            Some(EXCLUSION_VIOLATION | SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ) {
            metrics::counter!("hotel.store.conflicts").increment(1);
            return StoreError::Conflict(format!("{context}: {db}"));
        }
    }
    StoreError::Database(format!("{context}: {error}"))
}

// ============================================================================
// Pool
// ============================================================================

/// Connection pool settings.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    /// `postgres://` connection string
    pub url: String,
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a connection before failing
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    /// Settings with default pool sizing for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// PostgreSQL-backed [`HotelStore`].
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn connect(settings: &PoolSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }

    /// Applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ------------------------------------------------------------------
    // Seeding (catalog, rooms and sessions are owned outside the core)
    // ------------------------------------------------------------------

    /// Inserts a room type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    pub async fn insert_room_type(&self, room_type: &RoomType) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO room_types (id, name, description, base_price_cents, max_adults, \
             max_children, discount_percent, amenities) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(room_type.id.as_uuid())
        .bind(&room_type.name)
        .bind(&room_type.description)
        .bind(db_cents(room_type.base_price)?)
        .bind(db_count(room_type.max_adults)?)
        .bind(db_count(room_type.max_children)?)
        .bind(db_count(room_type.discount_percent)?)
        .bind(&room_type.amenities)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert room type", &e))?;
        Ok(())
    }

    /// Inserts a room. Rooms are allocated in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    pub async fn insert_room(&self, room: &Room) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO rooms (id, number, room_type_id, floor, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, clock_timestamp())",
        )
        .bind(room.id.as_uuid())
        .bind(&room.number)
        .bind(room.room_type_id.as_uuid())
        .bind(room.floor)
        .bind(room.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert room", &e))?;
        Ok(())
    }

    /// Inserts a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    pub async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (token, user_id, role, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(session.token)
            .bind(session.user_id.as_uuid())
            .bind(session.role.as_str())
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to insert session", &e))?;
        Ok(())
    }
}

impl HotelStore for PgStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        Box::pin(async move {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| store_error("Failed to begin transaction", &e))?;
            Ok(Box::new(PgTransaction::new(tx)) as Box<dyn StoreTransaction>)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("Ping failed", &e))?;
            Ok(())
        })
    }

    fn room_type(&self, id: RoomTypeId) -> StoreFuture<'_, Option<RoomType>> {
        Box::pin(async move {
            let row: Option<RoomTypeRow> = sqlx::query_as(ROOM_TYPE_SELECT)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load room type", &e))?;
            rows::optional(row)
        })
    }

    fn room(&self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        Box::pin(async move {
            let row: Option<RoomRow> = sqlx::query_as(room_select!("WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load room", &e))?;
            rows::optional(row)
        })
    }

    fn reservation(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move {
            let row: Option<ReservationRow> = sqlx::query_as(reservation_select!("WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load reservation", &e))?;
            rows::optional(row)
        })
    }

    fn booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row: Option<BookingRow> = sqlx::query_as(booking_select!("WHERE b.id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load booking", &e))?;
            rows::optional(row)
        })
    }

    fn payment(&self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        Box::pin(async move {
            let row: Option<PaymentRow> = sqlx::query_as(payment_select!("WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to load payment", &e))?;
            rows::optional(row)
        })
    }

    fn list_reservations(
        &self,
        filter: ReservationFilter,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let rows: Vec<ReservationRow> = sqlx::query_as(reservation_select!(
                "WHERE ($1::uuid IS NULL OR guest_id = $1) \
                 AND ($2::text IS NULL OR \
                      (CASE WHEN status = 'pending' AND expires_at <= $3 \
                            THEN 'expired' ELSE status END) = $2) \
                 ORDER BY created_at DESC, id"
            ))
            .bind(filter.guest_id.map(|id| *id.as_uuid()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to list reservations", &e))?;
            rows::all(rows)
        })
    }

    fn list_bookings(&self, filter: BookingFilter, page: Page) -> StoreFuture<'_, Paged<Booking>> {
        Box::pin(async move {
            let guest = filter.guest_id.map(|id| *id.as_uuid());
            let status = filter.status.map(|s| s.as_str());

            let (total,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM bookings \
                 WHERE ($1::uuid IS NULL OR guest_id = $1) AND ($2::text IS NULL OR status = $2)",
            )
            .bind(guest)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("Failed to count bookings", &e))?;

            let rows: Vec<BookingRow> = sqlx::query_as(booking_select!(
                "WHERE ($1::uuid IS NULL OR b.guest_id = $1) \
                 AND ($2::text IS NULL OR b.status = $2) \
                 ORDER BY b.created_at DESC, b.id LIMIT $3 OFFSET $4"
            ))
            .bind(guest)
            .bind(status)
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to list bookings", &e))?;

            Ok(Paged {
                items: rows::all(rows)?,
                total: u64::try_from(total)
                    .map_err(|_| StoreError::Corrupt(format!("negative count {total}")))?,
                page,
            })
        })
    }

    fn session(&self, token: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, Option<Session>> {
        Box::pin(async move {
            let row: Option<SessionRow> = sqlx::query_as(
                "SELECT token, user_id, role, expires_at FROM sessions \
                 WHERE token = $1 AND expires_at > $2",
            )
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to load session", &e))?;
            rows::optional(row)
        })
    }

    fn expire_stale_reservations(&self, now: DateTime<Utc>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE reservations SET status = 'expired' \
                 WHERE status = 'pending' AND expires_at <= $1",
            )
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to expire reservations", &e))?;
            Ok(result.rows_affected())
        })
    }
}
