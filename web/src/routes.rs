//! Router assembly.

use crate::handlers::{bookings, health, reservations, rooms};
use crate::middleware::{RequestIdLayer, trace_layer};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Builds the full HTTP router.
///
/// Layers run outside-in: request id first, then tracing, so the span
/// carries the id.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Reservations
        .route(
            "/reservations",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route("/reservations/my", get(reservations::my_reservations))
        .route("/reservations/:id", get(reservations::get_reservation))
        .route(
            "/reservations/:id/status",
            patch(reservations::update_reservation_status),
        )
        .route(
            "/reservations/:id/cancel",
            post(reservations::cancel_reservation),
        )
        // Bookings
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/my", get(bookings::my_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/payment", get(bookings::get_booking_payment))
        .route("/bookings/:id/status", patch(bookings::update_booking_status))
        .route(
            "/bookings/:id/confirm-payment",
            post(bookings::confirm_payment),
        )
        // Rooms
        .route(
            "/room-types/:id/availability",
            get(rooms::room_availability),
        )
        .route("/rooms/:id/status", patch(rooms::update_room_status))
        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check));

    api.layer(trace_layer())
        .layer(RequestIdLayer)
        .with_state(state)
}
