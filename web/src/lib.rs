//! HTTP surface and server runtime for the hotel booking service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  axum router (this crate)                │  ← JSON, bearer sessions,
//! │  handlers → AppState managers            │    request ids, tracing
//! ├──────────────────────────────────────────┤
//! │  hotel-core managers                     │  ← pricing, availability,
//! │  Reservation / Booking / Room            │    state machines
//! ├──────────────────────────────────────────┤
//! │  HotelStore: PgStore | InMemoryStore     │  ← transactions, row locks
//! └──────────────────────────────────────────┘
//!      ▲ expiry sweeper      ▲ notification dispatcher (runtime)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hotel_web::{AppState, routes::build_router};
//!
//! let state = AppState::new(&env);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod runtime;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use extractors::{BearerToken, RequireStaff, SessionUser};
pub use routes::build_router;
pub use state::AppState;
