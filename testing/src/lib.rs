//! # Hotel Testing
//!
//! Testing utilities for the hotel booking service.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a transactional, serializable in-memory [`HotelStore`]
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Notifiers that record or fail ([`RecordingNotifier`], [`FailingNotifier`])
//! - A seeded hotel fixture ([`TestHotel`])
//! - Property-test strategies for stay windows
//!
//! ## Example
//!
//! ```ignore
//! use hotel_testing::TestHotel;
//!
//! #[tokio::test]
//! async fn hold_a_room() {
//!     let hotel = TestHotel::deluxe(2).await;
//!     let reservation = hotel.reservations().create(hotel.request(1, 3)).await.unwrap();
//!     assert_eq!(reservation.total.cents(), 20_700);
//! }
//! ```
//!
//! [`HotelStore`]: hotel_core::HotelStore

pub mod fixtures;
pub mod mocks;
pub mod properties;
pub mod store;

pub use fixtures::TestHotel;
pub use mocks::{FailingNotifier, FixedClock, ManualClock, RecordingNotifier, test_clock};
pub use store::{InMemoryStore, Snapshot};

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber honouring `RUST_LOG`.
/// Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
