//! Reservation (soft hold) endpoints.
//!
//! | Method & path                   | Who          |
//! |---------------------------------|--------------|
//! | `POST /reservations`            | any session  |
//! | `GET /reservations/my`          | any session  |
//! | `GET /reservations`             | staff        |
//! | `GET /reservations/:id`         | owner, staff |
//! | `PATCH /reservations/:id/status`| staff        |
//! | `POST /reservations/:id/cancel` | owner, staff |

use super::{body, required, status, stay};
use crate::error::AppError;
use crate::extractors::{RequireStaff, SessionUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use hotel_core::environment::Clock;
use hotel_core::{
    CreateReservation, Reservation, ReservationFilter, ReservationId, ReservationStatus,
    RoomTypeId, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /reservations` body.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Requested room type
    pub room_type_id: Option<Uuid>,
    /// Arrival date
    pub check_in: Option<String>,
    /// Departure date
    pub check_out: Option<String>,
    /// Adults, defaults to 1
    pub adults: Option<u32>,
    /// Children, defaults to 0
    #[serde(default)]
    pub children: u32,
    /// Guest to hold for; staff only
    pub guest_id: Option<Uuid>,
}

/// Reservation as returned to clients, with the effective status.
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    /// Identifier
    pub id: Uuid,
    /// Human-readable code
    pub code: String,
    /// Guest holding the room
    pub guest_id: Uuid,
    /// Requested type
    pub room_type_id: Uuid,
    /// Held room
    pub room_id: Uuid,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Nights
    pub nights: u32,
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
    /// Nightly rate after discount
    pub price_per_night: f64,
    /// Before tax
    pub subtotal: f64,
    /// Tax
    pub tax: f64,
    /// Total price
    pub total_price: f64,
    /// `pending`, `confirmed`, `expired` or `cancelled`
    pub status: ReservationStatus,
    /// Hold deadline
    pub expires_at: DateTime<Utc>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl ReservationResponse {
    /// Client view of `reservation`, lazily expired at `now`.
    #[must_use]
    pub fn new(reservation: &Reservation, now: DateTime<Utc>) -> Self {
        Self {
            id: *reservation.id.as_uuid(),
            code: reservation.code.clone(),
            guest_id: *reservation.guest_id.as_uuid(),
            room_type_id: *reservation.room_type_id.as_uuid(),
            room_id: *reservation.room.room_id.as_uuid(),
            check_in: reservation.stay.check_in(),
            check_out: reservation.stay.check_out(),
            nights: reservation.room.nights,
            adults: reservation.adults,
            children: reservation.children,
            price_per_night: reservation.room.price_per_night.as_decimal(),
            subtotal: reservation.subtotal.as_decimal(),
            tax: reservation.tax.as_decimal(),
            total_price: reservation.total.as_decimal(),
            status: reservation.effective_status(now),
            expires_at: reservation.expires_at,
            created_at: reservation.created_at,
        }
    }
}

/// `GET /reservations` query.
#[derive(Debug, Default, Deserialize)]
pub struct ListReservationsQuery {
    /// Effective status filter
    pub status: Option<String>,
}

/// `PATCH /reservations/:id/status` body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status
    pub status: Option<String>,
}

fn parse_status(value: &str) -> Result<ReservationStatus, AppError> {
    Ok(status(
        value,
        ReservationStatus::parse,
        ReservationStatus::ALL,
        |s| s.as_str(),
    )?)
}

fn views(state: &AppState, reservations: &[Reservation]) -> Vec<ReservationResponse> {
    let now = state.clock.now();
    reservations
        .iter()
        .map(|r| ReservationResponse::new(r, now))
        .collect()
}

/// Places a 15-minute hold on the first free room of the requested type.
///
/// # Errors
///
/// 400 for missing fields, bad dates or no availability; 404 for an
/// unknown room type; 403 when a guest books for someone else.
pub async fn create_reservation(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let request = body(payload)?;
    let window = stay(request.check_in.as_deref(), request.check_out.as_deref())?;
    let room_type_id = RoomTypeId::from_uuid(required(request.room_type_id, "room_type_id")?);

    let guest_id = match request.guest_id {
        Some(guest) if actor.role.is_staff() => UserId::from_uuid(guest),
        Some(guest) if guest != *actor.user_id.as_uuid() => {
            return Err(AppError::forbidden("Guests can only reserve for themselves"));
        }
        _ => actor.user_id,
    };

    let reservation = state
        .reservations
        .create(CreateReservation {
            guest_id,
            room_type_id,
            stay: window,
            adults: request.adults.unwrap_or(1),
            children: request.children,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::new(&reservation, state.clock.now())),
    ))
}

/// The caller's reservations, newest first.
///
/// # Errors
///
/// 401 without a session; 500 on storage failure.
pub async fn my_reservations(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let reservations = state.reservations.my_reservations(actor.user_id).await?;
    Ok(Json(views(&state, &reservations)))
}

/// Every reservation, optionally filtered by effective status.
///
/// # Errors
///
/// 403 for guests; 400 for an unknown status.
pub async fn list_reservations(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let reservations = state
        .reservations
        .list(ReservationFilter {
            guest_id: None,
            status,
        })
        .await?;
    Ok(Json(views(&state, &reservations)))
}

/// One reservation.
///
/// # Errors
///
/// 404 if unknown; 403 if it belongs to another guest.
pub async fn get_reservation(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state
        .reservations
        .get(actor, ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationResponse::new(&reservation, state.clock.now())))
}

/// Staff status override.
///
/// # Errors
///
/// 404 if unknown; 400 for a disallowed transition.
pub async fn update_reservation_status(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, AppError> {
    let request = body(payload)?;
    let next = parse_status(&required(request.status, "status")?)?;
    let reservation = state
        .reservations
        .set_status(ReservationId::from_uuid(id), next)
        .await?;
    Ok(Json(ReservationResponse::new(&reservation, state.clock.now())))
}

/// Cancels a pending hold.
///
/// # Errors
///
/// 404 if unknown; 403 for another guest's hold; 400 unless pending.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    SessionUser { actor }: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state
        .reservations
        .cancel(actor, ReservationId::from_uuid(id))
        .await?;
    Ok(Json(ReservationResponse::new(&reservation, state.clock.now())))
}
