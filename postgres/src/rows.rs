//! Row types and their mapping to domain values.
//!
//! Amounts are stored as `BIGINT` cents and counts as `INTEGER`; statuses
//! are the lowercase strings of the `as_str` conversions. Any value that
//! does not map back cleanly surfaces as [`StoreError::Corrupt`].

use chrono::{DateTime, Utc};
use hotel_core::{
    Booking, BookingStatus, Money, Payment, PaymentMethod, PaymentStatus, Reservation,
    ReservationStatus, Role, Room, RoomLine, RoomStatus, RoomType, Session, StayWindow,
    StoreError,
};
use serde::Deserialize;
use sqlx::types::Json;
use std::fmt::Display;
use uuid::Uuid;

// ============================================================================
// Column helpers
// ============================================================================

fn corrupt(column: &str, value: impl Display) -> StoreError {
    StoreError::Corrupt(format!("{column} holds unexpected value {value}"))
}

fn money(cents: i64, column: &str) -> Result<Money, StoreError> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| corrupt(column, cents))
}

fn count(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}

fn status<T>(value: &str, column: &str, parse: fn(&str) -> Option<T>) -> Result<T, StoreError> {
    parse(value).ok_or_else(|| corrupt(column, value))
}

fn window(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<StayWindow, StoreError> {
    StayWindow::new(check_in, check_out)
        .map_err(|_| corrupt("check_in/check_out", format!("{check_in}..{check_out}")))
}

/// Money as a `BIGINT` bind value.
pub(crate) fn db_cents(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Database(format!("Amount {amount} exceeds column range")))
}

/// Count as an `INTEGER` bind value.
pub(crate) fn db_count(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Database(format!("Count {value} exceeds column range")))
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct RoomTypeRow {
    id: Uuid,
    name: String,
    description: String,
    base_price_cents: i64,
    max_adults: i32,
    max_children: i32,
    discount_percent: i32,
    amenities: Vec<String>,
}

impl TryFrom<RoomTypeRow> for RoomType {
    type Error = StoreError;

    fn try_from(row: RoomTypeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            base_price: money(row.base_price_cents, "room_types.base_price_cents")?,
            max_adults: count(row.max_adults, "room_types.max_adults")?,
            max_children: count(row.max_children, "room_types.max_children")?,
            discount_percent: count(row.discount_percent, "room_types.discount_percent")?,
            amenities: row.amenities,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoomRow {
    id: Uuid,
    number: String,
    room_type_id: Uuid,
    floor: i32,
    status: String,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            number: row.number,
            room_type_id: row.room_type_id.into(),
            floor: row.floor,
            status: status(&row.status, "rooms.status", RoomStatus::parse)?,
        })
    }
}

// ============================================================================
// Reservations
// ============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: Uuid,
    code: String,
    guest_id: Uuid,
    room_type_id: Uuid,
    room_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    adults: i32,
    children: i32,
    price_per_night_cents: i64,
    nights: i32,
    line_subtotal_cents: i64,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            code: row.code,
            guest_id: row.guest_id.into(),
            room_type_id: row.room_type_id.into(),
            stay: window(row.check_in, row.check_out)?,
            adults: count(row.adults, "reservations.adults")?,
            children: count(row.children, "reservations.children")?,
            room: RoomLine {
                room_id: row.room_id.into(),
                price_per_night: money(
                    row.price_per_night_cents,
                    "reservations.price_per_night_cents",
                )?,
                nights: count(row.nights, "reservations.nights")?,
                subtotal: money(row.line_subtotal_cents, "reservations.line_subtotal_cents")?,
            },
            subtotal: money(row.subtotal_cents, "reservations.subtotal_cents")?,
            tax: money(row.tax_cents, "reservations.tax_cents")?,
            total: money(row.total_cents, "reservations.total_cents")?,
            status: status(&row.status, "reservations.status", ReservationStatus::parse)?,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// One `booking_rooms` row, aggregated into JSON by the booking select.
#[derive(Deserialize)]
pub(crate) struct LineRow {
    room_id: Uuid,
    price_per_night_cents: i64,
    nights: i32,
    subtotal_cents: i64,
}

impl TryFrom<LineRow> for RoomLine {
    type Error = StoreError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            room_id: row.room_id.into(),
            price_per_night: money(
                row.price_per_night_cents,
                "booking_rooms.price_per_night_cents",
            )?,
            nights: count(row.nights, "booking_rooms.nights")?,
            subtotal: money(row.subtotal_cents, "booking_rooms.subtotal_cents")?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    code: String,
    reservation_id: Option<Uuid>,
    guest_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    adults: i32,
    children: i32,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    status: String,
    payment_method: String,
    payment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    lines: Json<Vec<LineRow>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let rooms = row
            .lines
            .0
            .into_iter()
            .map(RoomLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if rooms.is_empty() {
            return Err(StoreError::Corrupt(format!("booking {} has no rooms", row.id)));
        }
        Ok(Self {
            id: row.id.into(),
            code: row.code,
            reservation_id: row.reservation_id.map(Into::into),
            guest_id: row.guest_id.into(),
            stay: window(row.check_in, row.check_out)?,
            adults: count(row.adults, "bookings.adults")?,
            children: count(row.children, "bookings.children")?,
            rooms,
            subtotal: money(row.subtotal_cents, "bookings.subtotal_cents")?,
            tax: money(row.tax_cents, "bookings.tax_cents")?,
            total: money(row.total_cents, "bookings.total_cents")?,
            status: status(&row.status, "bookings.status", BookingStatus::parse)?,
            payment_method: status(
                &row.payment_method,
                "bookings.payment_method",
                PaymentMethod::parse,
            )?,
            payment_id: row.payment_id.map(Into::into),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================================================
// Payments and sessions
// ============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    guest_id: Uuid,
    amount_cents: i64,
    method: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            booking_id: row.booking_id.into(),
            guest_id: row.guest_id.into(),
            amount: money(row.amount_cents, "payments.amount_cents")?,
            method: status(&row.method, "payments.method", PaymentMethod::parse)?,
            status: status(&row.status, "payments.status", PaymentStatus::parse)?,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SessionRow {
    token: Uuid,
    user_id: Uuid,
    role: String,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            token: row.token,
            user_id: row.user_id.into(),
            role: status(&row.role, "sessions.role", Role::parse)?,
            expires_at: row.expires_at,
        })
    }
}

/// Maps an optional row, failing on a corrupt one.
pub(crate) fn optional<R, T>(row: Option<R>) -> Result<Option<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    row.map(T::try_from).transpose()
}

/// Maps every row, failing on the first corrupt one.
pub(crate) fn all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
