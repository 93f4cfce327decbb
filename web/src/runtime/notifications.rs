//! Channel-backed notification delivery.
//!
//! ```text
//! manager ──publish──► ChannelNotifier ──mpsc──► NotificationDispatcher ──► log
//! ```
//!
//! `publish` never waits: a full or closed channel is reported as a
//! [`NotifyError`], which the managers log and swallow.

use hotel_core::Notification;
use hotel_core::notify::{Notifier, NotifyError};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// [`Notifier`] that hands notifications to a bounded channel.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the dispatcher draining it.
    #[must_use]
    pub fn new(
        buffer: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, NotificationDispatcher) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, NotificationDispatcher { rx, shutdown })
    }
}

impl Notifier for ChannelNotifier {
    fn publish(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            self.tx.try_send(notification).map_err(|e| match e {
                mpsc::error::TrySendError::Full(n) => {
                    NotifyError::Delivery(format!("queue full, dropped {}", n.kind()))
                }
                mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
            })
        })
    }
}

/// Background task delivering queued notifications.
///
/// Delivery is a structured log line per notification; email and push
/// channels plug in here.
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<Notification>,
    shutdown: broadcast::Receiver<()>,
}

impl NotificationDispatcher {
    /// Spawns the dispatch loop.
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("Notification dispatcher started");
        loop {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(notification) => deliver(&notification),
                    None => break,
                },
                _ = self.shutdown.recv() => {
                    // Flush what is already queued.
                    while let Ok(notification) = self.rx.try_recv() {
                        deliver(&notification);
                    }
                    info!("Notification dispatcher received shutdown signal");
                    break;
                }
            }
        }
    }
}

fn deliver(notification: &Notification) {
    match serde_json::to_string(notification) {
        Ok(payload) => info!(kind = notification.kind(), %payload, "Notification dispatched"),
        Err(error) => warn!(kind = notification.kind(), error = %error, "Failed to encode notification"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hotel_core::{ReservationId, UserId};
    use std::time::Duration;

    fn cancelled() -> Notification {
        Notification::ReservationCancelled {
            guest_id: UserId::new(),
            reservation_id: ReservationId::new(),
        }
    }

    #[tokio::test]
    async fn test_full_queue_is_a_delivery_error() {
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (notifier, _dispatcher) = ChannelNotifier::new(1, shutdown_rx);

        notifier.publish(cancelled()).await.unwrap();
        let err = notifier.publish(cancelled()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_closed_queue_and_shutdown() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (notifier, dispatcher) = ChannelNotifier::new(8, shutdown_rx);
        notifier.publish(cancelled()).await.unwrap();

        let handle = dispatcher.spawn();
        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let err = notifier.publish(cancelled()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Closed));
    }
}
