//! Room availability and housekeeping endpoints.

use super::{body, required, status, stay};
use crate::error::AppError;
use crate::extractors::{RequireStaff, SessionUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use hotel_core::{Room, RoomId, RoomStatus, RoomTypeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `GET /room-types/:id/availability` query.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Arrival date
    pub check_in: Option<String>,
    /// Departure date
    pub check_out: Option<String>,
}

/// Room as returned to clients.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// Identifier
    pub id: Uuid,
    /// Door number
    pub number: String,
    /// Catalog entry
    pub room_type_id: Uuid,
    /// Floor
    pub floor: i32,
    /// Live status
    pub status: RoomStatus,
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            id: *room.id.as_uuid(),
            number: room.number.clone(),
            room_type_id: *room.room_type_id.as_uuid(),
            floor: room.floor,
            status: room.status,
        }
    }
}

/// Free rooms of one type for a stay.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Queried type
    pub room_type_id: Uuid,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Nights
    pub nights: u32,
    /// Free rooms, in allocation order
    pub rooms: Vec<RoomResponse>,
}

/// `PATCH /rooms/:id/status` body.
#[derive(Debug, Deserialize)]
pub struct UpdateRoomStatusRequest {
    /// Target status
    pub status: Option<String>,
}

/// Lists free rooms of a type. Any signed-in user may ask.
///
/// # Errors
///
/// 400 for bad dates; 404 for an unknown room type.
pub async fn room_availability(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let window = stay(query.check_in.as_deref(), query.check_out.as_deref())?;
    let room_type_id = RoomTypeId::from_uuid(id);
    let rooms = state
        .reservations
        .available_rooms(room_type_id, window)
        .await?;

    Ok(Json(AvailabilityResponse {
        room_type_id: id,
        check_in: window.check_in(),
        check_out: window.check_out(),
        nights: window.nights(),
        rooms: rooms.iter().map(RoomResponse::from).collect(),
    }))
}

/// Housekeeping or front-desk status change.
///
/// # Errors
///
/// 404 if unknown; 400 for statuses owned by the booking flow.
pub async fn update_room_status(
    State(state): State<AppState>,
    RequireStaff { actor }: RequireStaff,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateRoomStatusRequest>, JsonRejection>,
) -> Result<Json<RoomResponse>, AppError> {
    let request = body(payload)?;
    let next = status(
        &required(request.status, "status")?,
        RoomStatus::parse,
        RoomStatus::ALL,
        |s| s.as_str(),
    )?;
    let room = state.rooms.set_status(RoomId::from_uuid(id), next).await?;
    tracing::debug!(user_id = %actor.user_id, room_id = %id, status = %room.status, "Room updated by staff");
    Ok(Json(RoomResponse::from(&room)))
}
