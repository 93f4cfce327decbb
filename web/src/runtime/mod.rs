//! Background tasks and process lifecycle.
//!
//! - **`expiry`**: periodic sweep persisting lapsed holds as `expired`
//! - **`notifications`**: channel-backed notifier and its dispatcher task
//! - **`lifecycle`**: HTTP serving, shutdown broadcast and task draining
//!
//! Every background task owns a `broadcast::Receiver<()>` and exits when the
//! application broadcasts shutdown.

pub mod expiry;
pub mod lifecycle;
pub mod notifications;

pub use expiry::ExpirySweeper;
pub use lifecycle::Application;
pub use notifications::{ChannelNotifier, NotificationDispatcher};
