//! Test doubles
//!
//! A scripted backend that replays canned responses and records what it was
//! asked, so loop behaviour can be checked without a network.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{BackendResponse, ModelBackend};
use crate::error::{ChatError, Result};
use crate::message::Message;
use crate::tool::ToolDefinition;

/// One recorded `complete` call
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// Backend returning scripted responses in order.
///
/// Once the script runs out every call fails with [`ChatError::Backend`].
pub struct SequentialBackend {
    script: Mutex<VecDeque<Result<BackendResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SequentialBackend {
    pub fn new(responses: Vec<BackendResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    /// Script that may include failures
    pub fn from_results(script: Vec<Result<BackendResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Names of the tools offered on the `index`-th call
    pub fn tool_names(&self, index: usize) -> Vec<String> {
        lock(&self.requests)
            .get(index)
            .map(|r| r.tools.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelBackend for SequentialBackend {
    fn name(&self) -> &str {
        "sequential"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<BackendResponse> {
        let call_number = {
            let mut requests = lock(&self.requests);
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
            });
            requests.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        lock(&self.script).pop_front().unwrap_or_else(|| {
            Err(ChatError::Backend(format!(
                "no scripted response for call #{call_number}"
            )))
        })
    }
}
