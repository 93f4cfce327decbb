//! Reservation, availability and booking rules for the hotel booking service.
//!
//! This crate is the functional core of the service. It owns every rule that
//! decides whether a physical room can be held, reserved and converted into a
//! paid booking without being handed to two guests for the same night.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │ ReservationManager   │      │   BookingManager     │
//! │  15-minute holds     │      │  hold → firm booking │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │                             │
//!            └──────────────┬──────────────┘
//!                           ▼
//!                ┌──────────────────────┐
//!                │  Availability Oracle │  overlap + maintenance +
//!                └──────────┬───────────┘  same-day readiness
//!                           ▼
//!                ┌──────────────────────┐
//!                │  StoreTransaction    │  one atomic unit of work
//!                └──────────────────────┘
//! ```
//!
//! Notifications are published through a [`notify::Notifier`] strictly after a
//! transaction commits; a failed notification never fails the operation.
//!
//! # Storage
//!
//! Managers are written once against [`store::HotelStore`]. Two
//! implementations exist: `hotel-postgres` for production and
//! `hotel-testing` for fast deterministic tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod bookings;
pub mod code;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod notify;
pub mod pricing;
pub mod reservations;
pub mod rooms;
pub mod stay;
pub mod store;
pub mod types;

pub use bookings::{BookingManager, CreateBooking};
pub use environment::{Clock, HotelEnvironment, SystemClock};
pub use error::{HotelError, Result, StoreError};
pub use money::Money;
pub use notify::{Notification, Notifier};
pub use reservations::{CreateReservation, ReservationManager};
pub use rooms::RoomManager;
pub use stay::StayWindow;
pub use store::{HotelStore, StoreTransaction};
pub use types::*;
