//! Notifications
//!
//! Tools that need to tell a human something (a new contact, a question the
//! model could not answer) go through a `Notifier`.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a short text notification
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Notifier used when no delivery channel is configured; only logs
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::info!(%message, "Notification (delivery disabled)");
        Ok(())
    }
}
