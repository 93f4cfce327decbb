//! Housekeeping and front-desk room status updates.
//!
//! The booking flow moves rooms through `Reserved`, `Occupied` and `Dirty`.
//! Staff close the loop by hand (`Dirty → Cleaning → Available`), which is
//! the signal same-day arrivals wait for.

use crate::environment::HotelEnvironment;
use crate::error::{HotelError, Result};
use crate::types::{Room, RoomId, RoomStatus};
use tracing::{info, instrument};

/// Reads rooms and applies manual status changes.
#[derive(Clone, Debug)]
pub struct RoomManager {
    env: HotelEnvironment,
}

impl RoomManager {
    /// Creates a manager over the given environment.
    #[must_use]
    pub const fn new(env: HotelEnvironment) -> Self {
        Self { env }
    }

    /// One room.
    ///
    /// # Errors
    ///
    /// [`HotelError::NotFound`] for an unknown room.
    pub async fn get(&self, id: RoomId) -> Result<Room> {
        self.env
            .store
            .room(id)
            .await?
            .ok_or_else(|| HotelError::not_found("Room", id))
    }

    /// Moves a room to `status` under its row lock.
    ///
    /// # Errors
    ///
    /// - [`HotelError::NotFound`] for an unknown room
    /// - [`HotelError::InvalidTransition`] for statuses owned by the booking flow
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: RoomId, status: RoomStatus) -> Result<Room> {
        let mut tx = self.env.store.begin().await?;
        let mut room = tx
            .lock_room(id)
            .await?
            .ok_or_else(|| HotelError::not_found("Room", id))?;

        let from = room.status;
        room.status = from.set_manually(status)?;
        tx.set_room_status(vec![id], room.status).await?;
        tx.commit().await?;

        metrics::counter!("hotel.rooms.status_changed", "to" => room.status.as_str()).increment(1);
        info!(room_id = %id, number = %room.number, %from, to = %room.status, "Room status changed");
        Ok(room)
    }
}
