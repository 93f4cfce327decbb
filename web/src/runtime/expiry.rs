//! Periodic expiry of lapsed soft holds.
//!
//! Reads already treat a pending hold past its deadline as expired; the
//! sweep is what persists it. Each tick is one bulk conditional update, so
//! overlapping sweeps (several server replicas) are harmless.

use hotel_core::ReservationManager;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Background task running [`ReservationManager::expire_stale`] on a timer.
pub struct ExpirySweeper {
    manager: ReservationManager,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ExpirySweeper {
    /// Creates a sweeper ticking every `interval`.
    #[must_use]
    pub const fn new(
        manager: ReservationManager,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// Spawns the sweep loop.
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs one sweep. Failures are logged; the next tick retries.
    pub async fn sweep_once(&self) -> u64 {
        match self.manager.expire_stale().await {
            Ok(expired) => {
                debug!(expired, "Expiry sweep finished");
                expired
            }
            Err(error) => {
                warn!(error = %error, "Expiry sweep failed");
                0
            }
        }
    }

    async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                _ = self.shutdown.recv() => {
                    info!("Expiry sweeper received shutdown signal");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hotel_testing::TestHotel;

    #[tokio::test]
    async fn test_sweep_persists_lapsed_holds() {
        let hotel = TestHotel::deluxe(1).await;
        let manager = hotel.reservations();
        manager.create(hotel.request(1, 3)).await.unwrap();

        let (_tx, rx) = broadcast::channel(1);
        let sweeper = ExpirySweeper::new(manager, Duration::from_secs(60), rx);
        assert_eq!(sweeper.sweep_once().await, 0);

        hotel.clock.advance(chrono::Duration::minutes(15));
        assert_eq!(sweeper.sweep_once().await, 1);
        assert_eq!(sweeper.sweep_once().await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let hotel = TestHotel::deluxe(0).await;
        let (tx, rx) = broadcast::channel(1);
        let handle = ExpirySweeper::new(hotel.reservations(), Duration::from_secs(3600), rx).spawn();

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
