//! # chatloop-runtime
//!
//! Concrete integrations for the chatloop system.
//!
//! ## Backends
//!
//! - **OpenAI** (default): any `/chat/completions` endpoint with function calling
//!
//! ## Notifiers
//!
//! - **Pushover** (default): push messages to a phone
//! - **Log**: fallback when no Pushover credentials are configured
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatloop_runtime::{notifier_from_settings, OpenAiBackend};
//!
//! let settings = Settings::from_env()?;
//! let backend = Arc::new(OpenAiBackend::from_settings(&settings)?);
//! let chat = ConversationLoop::new(backend, settings.loop_config());
//! let notifier = notifier_from_settings(&settings);
//! ```

use std::sync::Arc;

use chatloop_core::{LogNotifier, Notifier, Settings};

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "pushover")]
pub mod pushover;

#[cfg(feature = "openai")]
pub use openai::{OpenAiBackend, OpenAiConfig};

#[cfg(feature = "pushover")]
pub use pushover::PushoverNotifier;

// Re-export core types for convenience
pub use chatloop_core::{
    ChatError, ConversationLoop, ModelBackend, Result, Session, Tool, ToolRegistry,
};

/// Pick the notifier the settings ask for
pub fn notifier_from_settings(settings: &Settings) -> Arc<dyn Notifier> {
    match &settings.pushover {
        #[cfg(feature = "pushover")]
        Some(pushover) => {
            tracing::info!("Push notifications enabled");
            Arc::new(PushoverNotifier::new(pushover.clone()))
        }
        _ => {
            tracing::info!("Push notifications disabled, logging instead");
            Arc::new(LogNotifier)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response on a local port.
    ///
    /// Returns a base URL ending in `/v1` and a handle yielding the raw request.
    pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}/v1"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|line| {
                line.to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .and_then(|v| v.trim().parse::<usize>().ok())
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + length
    }
}
