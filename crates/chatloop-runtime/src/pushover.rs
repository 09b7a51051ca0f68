//! Pushover push notifications

use async_trait::async_trait;
use chatloop_core::{
    error::{ChatError, Result},
    notify::Notifier,
    PushoverSettings,
};

/// Sends each notification as a Pushover message
pub struct PushoverNotifier {
    client: reqwest::Client,
    settings: PushoverSettings,
}

impl PushoverNotifier {
    pub fn new(settings: PushoverSettings) -> Self {
        Self::with_client(settings, reqwest::Client::new())
    }

    pub const fn with_client(settings: PushoverSettings, client: reqwest::Client) -> Self {
        Self { client, settings }
    }
}

impl std::fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::debug!(%message, "Sending push notification");

        let form = [
            ("user", self.settings.user.as_str()),
            ("token", self.settings.token.as_str()),
            ("message", message),
        ];

        let response = self
            .client
            .post(&self.settings.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ChatError::Notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Notification(format!("HTTP {status}: {body}")));
        }

        Ok(())
    }
}
