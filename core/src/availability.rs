//! Availability oracle.
//!
//! A room is available for a stay when all of these hold:
//!
//! 1. no other active reservation on the room overlaps the stay (pending
//!    holds past their deadline do not count)
//! 2. no other active booking on the room overlaps the stay
//! 3. the room is not in maintenance
//! 4. if the stay starts today, the room's live status is exactly
//!    `available`
//!
//! The oracle has no side effects besides the row lock [`check_room`]
//! takes on the room, which keeps concurrent check-then-write sequences on
//! the same room serialized until the surrounding transaction ends.
//! [`inspect_room`] runs the same checks on a plain read. A write path
//! scans with it and locks only the room it is about to claim, so it never
//! holds a lock on a room it turned down.

use crate::error::Result;
use crate::stay::StayWindow;
use crate::store::StoreTransaction;
use crate::types::{BookingId, ReservationId, Room, RoomId, RoomStatus, RoomTypeId};
use chrono::{DateTime, Utc};

/// Why a room was turned down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unavailable {
    /// No such room.
    UnknownRoom,
    /// An active hold overlaps.
    HeldBy(ReservationId),
    /// An active booking overlaps.
    BookedBy(BookingId),
    /// Room is out of order.
    Maintenance,
    /// Same-day arrival into a room that is not ready.
    NotReady(RoomStatus),
}

/// Holds to ignore while checking, used when re-validating the records
/// being converted or updated.
#[derive(Clone, Copy, Debug, Default)]
pub struct Exclusions {
    /// Reservation whose own hold must not self-block
    pub reservation: Option<ReservationId>,
    /// Booking whose own lines must not self-block
    pub booking: Option<BookingId>,
}

/// Runs the four checks for one room, locking it first.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn check_room(
    tx: &mut dyn StoreTransaction,
    room_id: RoomId,
    stay: StayWindow,
    exclude: Exclusions,
    now: DateTime<Utc>,
) -> Result<std::result::Result<Room, Unavailable>> {
    let room = tx.lock_room(room_id).await?;
    evaluate(tx, room, stay, exclude, now).await
}

/// Runs the four checks for one room without locking it.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn inspect_room(
    tx: &mut dyn StoreTransaction,
    room_id: RoomId,
    stay: StayWindow,
    exclude: Exclusions,
    now: DateTime<Utc>,
) -> Result<std::result::Result<Room, Unavailable>> {
    let room = tx.room(room_id).await?;
    evaluate(tx, room, stay, exclude, now).await
}

async fn evaluate(
    tx: &mut dyn StoreTransaction,
    room: Option<Room>,
    stay: StayWindow,
    exclude: Exclusions,
    now: DateTime<Utc>,
) -> Result<std::result::Result<Room, Unavailable>> {
    let Some(room) = room else {
        return Ok(Err(Unavailable::UnknownRoom));
    };

    let holds = tx
        .overlapping_reservations(room.id, stay, exclude.reservation)
        .await?;
    if let Some(hold) = holds.iter().find(|r| r.blocks_room(now)) {
        return Ok(Err(Unavailable::HeldBy(hold.id)));
    }

    let bookings = tx.overlapping_bookings(room.id, stay, exclude.booking).await?;
    if let Some(booking) = bookings.iter().find(|b| b.status.is_active()) {
        return Ok(Err(Unavailable::BookedBy(booking.id)));
    }

    if room.status == RoomStatus::Maintenance {
        return Ok(Err(Unavailable::Maintenance));
    }

    if stay.starts_on(now.date_naive()) && room.status != RoomStatus::Available {
        return Ok(Err(Unavailable::NotReady(room.status)));
    }

    Ok(Ok(room))
}

/// Boolean form of [`inspect_room`].
///
/// # Errors
///
/// Propagates storage failures.
pub async fn is_room_available(
    tx: &mut dyn StoreTransaction,
    room_id: RoomId,
    stay: StayWindow,
    exclude: Exclusions,
    now: DateTime<Utc>,
) -> Result<bool> {
    let verdict = inspect_room(tx, room_id, stay, exclude, now).await?;
    if let Err(reason) = verdict {
        tracing::debug!(%room_id, ?reason, "Room unavailable");
    }
    Ok(verdict.is_ok())
}

/// Every available room of a type, in natural order. Takes no locks.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn available_rooms(
    tx: &mut dyn StoreTransaction,
    room_type_id: RoomTypeId,
    stay: StayWindow,
    now: DateTime<Utc>,
) -> Result<Vec<Room>> {
    let candidates = tx.rooms_of_type(room_type_id).await?;
    let mut available = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Ok(room) = inspect_room(tx, candidate.id, stay, Exclusions::default(), now).await? {
            available.push(room);
        }
    }
    Ok(available)
}

/// First available room of a type, locked.
///
/// Candidates are checked on plain reads in natural order; only the first
/// match is locked and checked again under the lock. If a concurrent
/// writer claimed it in between, the scan moves on.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn first_available_room(
    tx: &mut dyn StoreTransaction,
    room_type_id: RoomTypeId,
    stay: StayWindow,
    now: DateTime<Utc>,
) -> Result<Option<Room>> {
    let candidates = tx.rooms_of_type(room_type_id).await?;
    for candidate in candidates {
        let exclude = Exclusions::default();
        if let Err(reason) = inspect_room(tx, candidate.id, stay, exclude, now).await? {
            tracing::debug!(room_id = %candidate.id, ?reason, "Skipping room");
            continue;
        }
        match check_room(tx, candidate.id, stay, exclude, now).await? {
            Ok(room) => return Ok(Some(room)),
            Err(reason) => {
                tracing::debug!(room_id = %candidate.id, ?reason, "Room claimed concurrently");
            }
        }
    }
    Ok(None)
}
