//! Application lifecycle management and graceful shutdown.
//!
//! 1. **Startup**: background tasks are spawned once the database is live
//! 2. **Runtime**: the HTTP server runs until Ctrl+C or SIGTERM
//! 3. **Shutdown**: the server drains, shutdown is broadcast, and every
//!    background task gets `shutdown_timeout` to finish
//!
//! ```rust,ignore
//! let app = Application::new(listener, router, tasks, shutdown_tx, config);
//! app.run().await?;
//! ```

use crate::config::Config;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Named background task owned by the application.
pub type BackgroundTask = (&'static str, JoinHandle<()>);

/// Running application with all background tasks.
pub struct Application {
    /// TCP listener for HTTP server
    listener: tokio::net::TcpListener,

    /// Axum router with all HTTP routes
    app: axum::Router,

    /// Expiry sweeper, notification dispatcher, ...
    tasks: Vec<BackgroundTask>,

    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<()>,

    /// Application configuration
    config: Arc<Config>,
}

impl Application {
    /// Creates an application from its already-started parts.
    #[must_use]
    pub fn new(
        listener: tokio::net::TcpListener,
        app: axum::Router,
        tasks: Vec<BackgroundTask>,
        shutdown_tx: broadcast::Sender<()>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            listener,
            app,
            tasks,
            shutdown_tx,
            config,
        }
    }

    /// Serves HTTP until a shutdown signal, then drains background tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(address = %self.config.server_addr(), "HTTP server listening for requests");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped, initiating graceful shutdown...");

        // No receivers left is fine: the tasks already exited.
        let _ = self.shutdown_tx.send(());

        Self::await_shutdown(self.tasks, self.config.shutdown_timeout()).await;

        info!("Graceful shutdown complete");
        Ok(())
    }

    async fn await_shutdown(tasks: Vec<BackgroundTask>, timeout: std::time::Duration) {
        for (name, handle) in tasks {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => info!(task = name, "Background task stopped gracefully"),
                Ok(Err(e)) => warn!(task = name, error = %e, "Background task failed"),
                Err(_) => warn!(task = name, "Background task shutdown timed out"),
            }
        }
    }
}

/// Waits for Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed, that source is ignored and the other
/// one still triggers shutdown.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
