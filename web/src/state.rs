//! Shared state for HTTP handlers.

use hotel_core::environment::Clock;
use hotel_core::{BookingManager, HotelEnvironment, HotelStore, ReservationManager, RoomManager};
use std::sync::Arc;

/// Everything a handler needs, cloned per request.
///
/// The managers share one [`HotelEnvironment`], so the HTTP surface, the
/// expiry sweeper and the tests all see the same store, clock and notifier.
#[derive(Clone)]
pub struct AppState {
    /// Store for session lookups and health checks
    pub store: Arc<dyn HotelStore>,
    /// Clock for session expiry
    pub clock: Arc<dyn Clock>,
    /// Soft holds
    pub reservations: ReservationManager,
    /// Firm bookings and payments
    pub bookings: BookingManager,
    /// Manual room status changes
    pub rooms: RoomManager,
}

impl AppState {
    /// Builds the state from a configured environment.
    #[must_use]
    pub fn new(env: &HotelEnvironment) -> Self {
        Self {
            store: Arc::clone(&env.store),
            clock: Arc::clone(&env.clock),
            reservations: ReservationManager::new(env.clone()),
            bookings: BookingManager::new(env.clone()),
            rooms: RoomManager::new(env.clone()),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
