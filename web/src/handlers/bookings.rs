//! Booking endpoints.
//!
//! | Method & path                        | Who          |
//! |--------------------------------------|--------------|
//! | `POST /bookings`                     | any session  |
//! | `GET /bookings/my`                   | any session  |
//! | `GET /bookings`                      | staff        |
//! | `GET /bookings/:id`                  | owner, staff |
//! | `GET /bookings/:id/payment`          | owner, staff |
//! | `PATCH /bookings/:id/status`         | staff        |
//! | `POST /bookings/:id/confirm-payment` | staff        |

use super::{amount, body, required, status, stay};
use crate::error::AppError;
use crate::extractors::{RequireStaff, SessionUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use hotel_core::{
    Booking, BookingFilter, BookingId, BookingStatus, CreateBooking, HotelError, Page, Paged,
    Payment, PaymentMethod, PaymentStatus, ReservationId, RoomId, RoomLine, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Requests
// ============================================================================

/// One room line as submitted by the client.
#[derive(Debug, Deserialize)]
pub struct RoomLineRequest {
    /// Room
    pub room_id: Uuid,
    /// Quoted nightly rate
    pub price_per_night: f64,
    /// Nights
    pub nights: u32,
    /// `price_per_night × nights`
    pub subtotal: f64,
}

/// `POST /bookings` body. Totals are the client's quote and get re-checked.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Hold being converted; absent for walk-ins
    pub reservation_id: Option<Uuid>,
    /// Guest to book for; staff only
    pub guest_id: Option<Uuid>,
    /// Arrival date
    pub check_in: Option<String>,
    /// Departure date
    pub check_out: Option<String>,
    /// Adults, defaults to 1
    pub adults: Option<u32>,
    /// Children
    #[serde(default)]
    pub children: u32,
    /// Booked rooms
    #[serde(default)]
    pub rooms: Vec<RoomLineRequest>,
    /// Sum of line subtotals
    pub subtotal: Option<f64>,
    /// Tax
    pub tax: Option<f64>,
    /// Grand total
    #[serde(alias = "total")]
    pub total_price: Option<f64>,
    /// `Card` or `Cash`
    pub payment_method: Option<String>,
}

impl CreateBookingRequest {
    fn into_domain(self, guest_id: UserId) -> Result<CreateBooking, HotelError> {
        let stay = stay(self.check_in.as_deref(), self.check_out.as_deref())?;
        let method = required(self.payment_method, "payment_method")?;
        let payment_method = PaymentMethod::parse(&method).ok_or_else(|| {
            HotelError::validation("payment_method must be one of: Card, Cash")
        })?;
        let rooms = self
            .rooms
            .into_iter()
            .map(|line| {
                Ok(RoomLine {
                    room_id: RoomId::from_uuid(line.room_id),
                    price_per_night: amount(line.price_per_night, "price_per_night")?,
                    nights: line.nights,
                    subtotal: amount(line.subtotal, "subtotal")?,
                })
            })
            .collect::<Result<Vec<_>, HotelError>>()?;

        Ok(CreateBooking {
            guest_id,
            reservation_id: self.reservation_id.map(ReservationId::from_uuid),
            stay,
            adults: self.adults.unwrap_or(1),
            children: self.children,
            rooms,
            subtotal: amount(required(self.subtotal, "subtotal")?, "subtotal")?,
            tax: amount(required(self.tax, "tax")?, "tax")?,
            total: amount(required(self.total_price, "total_price")?, "total_price")?,
            payment_method,
        })
    }
}

/// `GET /bookings` query.
#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    /// Status filter
    pub status: Option<String>,
    /// 1-based page, defaults to 1
    pub page: Option<u32>,
    /// Page size, defaults to 10, at most 100
    pub limit: Option<u32>,
}

/// `PATCH /bookings/:id/status` body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status
    pub status: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Room line as returned to clients.
#[derive(Debug, Serialize)]
pub struct RoomLineResponse {
    /// Room
    pub room_id: Uuid,
    /// Nightly rate
    pub price_per_night: f64,
    /// Nights
    pub nights: u32,
    /// Line subtotal
    pub subtotal: f64,
}

impl From<&RoomLine> for RoomLineResponse {
    fn from(line: &RoomLine) -> Self {
        Self {
            room_id: *line.room_id.as_uuid(),
            price_per_night: line.price_per_night.as_decimal(),
            nights: line.nights,
            subtotal: line.subtotal.as_decimal(),
        }
    }
}

/// Booking as returned to clients.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Identifier
    pub id: Uuid,
    /// Human-readable code
    pub code: String,
    /// Converted hold
    pub reservation_id: Option<Uuid>,
    /// Guest
    pub guest_id: Uuid,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
    /// Booked rooms
    pub rooms: Vec<RoomLineResponse>,
    /// Before tax
    pub subtotal: f64,
    /// Tax
    pub tax: f64,
    /// Grand total
    pub total_price: f64,
    /// Lifecycle status
    pub status: BookingStatus,
    /// `Card` or `Cash`
    pub payment_method: PaymentMethod,
    /// Linked payment
    pub payment_id: Option<Uuid>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: *booking.id.as_uuid(),
            code: booking.code.clone(),
            reservation_id: booking.reservation_id.map(|id| *id.as_uuid()),
            guest_id: *booking.guest_id.as_uuid(),
            check_in: booking.stay.check_in(),
            check_out: booking.stay.check_out(),
            adults: booking.adults,
            children: booking.children,
            rooms: booking.rooms.iter().map(RoomLineResponse::from).collect(),
            subtotal: booking.subtotal.as_decimal(),
            tax: booking.tax.as_decimal(),
            total_price: booking.total.as_decimal(),
            status: booking.status,
            payment_method: booking.payment_method,
            payment_id: booking.payment_id.map(|id| *id.as_uuid()),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Payment as returned to clients.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Identifier
    pub id: Uuid,
    /// Booking paid for
    pub booking_id: Uuid,
    /// Amount
    pub amount: f64,
    /// `Card` or `Cash`
    pub method: PaymentMethod,
    /// Status
    pub status: PaymentStatus,
    /// Capture time
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            booking_id: *payment.booking_id.as_uuid(),
            amount: payment.amount.as_decimal(),
            method: payment.method,
            status: payment.status,
            completed_at: payment.completed_at,
        }
    }
}

/// Pagination block of `GET /bookings`.
#[derive(Debug, Serialize)]
pub struct Pagination {
    /// Current page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Matching bookings
    pub total: u64,
    /// Number of pages
    pub pages: u64,
}

/// `GET /bookings` response.
#[derive(Debug, Serialize)]
pub struct BookingPage {
    /// Bookings on this page
    pub bookings: Vec<BookingResponse>,
    /// Page metadata
    pub pagination: Pagination,
}

impl From<Paged<Booking>> for BookingPage {
    fn from(paged: Paged<Booking>) -> Self {
        Self {
            pagination: Pagination {
                page: paged.page.page,
                limit: paged.page.limit,
                total: paged.total,
                pages: paged.pages(),
            },
            bookings: paged.items.iter().map(BookingResponse::from).collect(),
        }
    }
}

/// `POST /bookings/:id/confirm-payment` response.
#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    /// Booking, now `confirmed`
    pub booking: BookingResponse,
    /// Payment, now `completed`
    pub payment: PaymentResponse,
}

// ============================================================================
// Handlers
// ============================================================================

fn parse_status(value: &str) -> Result<BookingStatus, AppError> {
    Ok(status(value, BookingStatus::parse, BookingStatus::ALL, |s| s.as_str())?)
}

/// Commits a booking with its payment, converting a hold when one is given.
///
/// # Errors
///
/// 400 for validation, price mismatch, lost rooms or a lapsed hold; 404 for
/// unknown rooms or reservations; 403 when booking for someone else.
pub async fn create_booking(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let request = body(payload)?;
    let guest_id = match request.guest_id {
        Some(guest) if actor.role.is_staff() => UserId::from_uuid(guest),
        Some(guest) if guest != *actor.user_id.as_uuid() => {
            return Err(AppError::forbidden("Guests can only book for themselves"));
        }
        _ => actor.user_id,
    };

    let booking = state.bookings.create(request.into_domain(guest_id)?).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

/// The caller's bookings, newest first.
///
/// # Errors
///
/// 401 without a session; 500 on storage failure.
pub async fn my_bookings(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.my_bookings(actor.user_id).await?;
    Ok(Json(bookings.iter().map(BookingResponse::from).collect()))
}

/// One page of bookings, optionally filtered by status.
///
/// # Errors
///
/// 403 for guests; 400 for an unknown status.
pub async fn list_bookings(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<BookingPage>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let defaults = Page::default();
    let page = Page::new(
        query.page.unwrap_or(defaults.page),
        query.limit.unwrap_or(defaults.limit),
    );
    let paged = state
        .bookings
        .list(
            BookingFilter {
                guest_id: None,
                status,
            },
            page,
        )
        .await?;
    Ok(Json(BookingPage::from(paged)))
}

/// One booking.
///
/// # Errors
///
/// 404 if unknown; 403 if it belongs to another guest.
pub async fn get_booking(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.get(actor, BookingId::from_uuid(id)).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// Payment of one booking.
///
/// # Errors
///
/// 404 if unknown; 403 if it belongs to another guest.
pub async fn get_booking_payment(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = state
        .bookings
        .payment(actor, BookingId::from_uuid(id))
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// Staff status change (check-in, check-out, cancel).
///
/// # Errors
///
/// 404 if unknown; 400 for a disallowed transition.
pub async fn update_booking_status(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, AppError> {
    let request = body(payload)?;
    let next = parse_status(&required(request.status, "status")?)?;
    let booking = state
        .bookings
        .update_status(BookingId::from_uuid(id), next)
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// Marks a cash booking as paid.
///
/// # Errors
///
/// 404 if unknown; 400 unless the booking is `confirmed_unpaid`.
pub async fn confirm_payment(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    let (booking, payment) = state
        .bookings
        .confirm_payment(BookingId::from_uuid(id))
        .await?;
    Ok(Json(ConfirmPaymentResponse {
        booking: BookingResponse::from(&booking),
        payment: PaymentResponse::from(&payment),
    }))
}
