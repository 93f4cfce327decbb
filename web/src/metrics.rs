//! Business metrics for the hotel booking service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `hotel.reservations.created` / `.cancelled` / `.expired` / `.rejected`
//! - `hotel.bookings.created{method}` / `.rejected{reason}`
//! - `hotel.bookings.status_changed{to}`, `hotel.payments.confirmed`
//! - `hotel.rooms.status_changed{to}`
//! - `hotel.store.conflicts`, `hotel.notifications.failed`

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Registers descriptions for every counter. Call once at start-up.
pub fn register_business_metrics() {
    describe_counter!(
        "hotel.reservations.created",
        "Soft holds placed"
    );
    describe_counter!(
        "hotel.reservations.cancelled",
        "Soft holds cancelled by their guest or staff"
    );
    describe_counter!(
        "hotel.reservations.expired",
        "Soft holds expired by the background sweep"
    );
    describe_counter!(
        "hotel.reservations.rejected",
        "Hold requests turned down for lack of availability"
    );
    describe_counter!(
        "hotel.bookings.created",
        "Bookings committed, by payment method"
    );
    describe_counter!(
        "hotel.bookings.rejected",
        "Bookings rejected at commit (price, unavailable, expired)"
    );
    describe_counter!(
        "hotel.bookings.status_changed",
        "Booking lifecycle transitions, by target status"
    );
    describe_counter!(
        "hotel.payments.confirmed",
        "Cash payments confirmed at the desk"
    );
    describe_counter!(
        "hotel.rooms.status_changed",
        "Manual room status changes, by target status"
    );
    describe_counter!(
        "hotel.store.conflicts",
        "Writes rejected by row locks or the overlap constraint"
    );
    describe_counter!(
        "hotel.notifications.failed",
        "Notifications that could not be delivered"
    );

    tracing::info!("Business metrics registered");
}

/// Installs the Prometheus recorder with an HTTP listener on `addr`.
///
/// # Errors
///
/// Fails if a recorder is already installed or the listener cannot bind.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
