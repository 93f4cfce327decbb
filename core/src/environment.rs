//! Injected dependencies shared by the managers.
//!
//! Every side-effecting collaborator (storage, time, notifications) sits
//! behind a trait object so tests can substitute deterministic versions.

use crate::notify::Notifier;
use crate::store::HotelStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Default lifetime of a soft hold.
pub const DEFAULT_HOLD_MINUTES: i64 = 15;

/// Environment dependencies for the reservation and booking managers.
#[derive(Clone)]
pub struct HotelEnvironment {
    /// Transactional storage
    pub store: Arc<dyn HotelStore>,
    /// Clock for timestamps, expiry deadlines and same-day checks
    pub clock: Arc<dyn Clock>,
    /// Post-commit notification sink
    pub notifier: Arc<dyn Notifier>,
    /// How long a pending reservation holds its room
    pub hold_duration: Duration,
}

impl HotelEnvironment {
    /// Creates an environment with the default 15-minute hold.
    #[must_use]
    pub fn new(
        store: Arc<dyn HotelStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            hold_duration: Duration::minutes(DEFAULT_HOLD_MINUTES),
        }
    }

    /// Overrides the hold duration.
    #[must_use]
    pub const fn with_hold_duration(mut self, hold_duration: Duration) -> Self {
        self.hold_duration = hold_duration;
        self
    }
}

impl std::fmt::Debug for HotelEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotelEnvironment")
            .field("hold_duration", &self.hold_duration)
            .finish_non_exhaustive()
    }
}
