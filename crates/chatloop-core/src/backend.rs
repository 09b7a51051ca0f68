//! Model Backend Strategy Pattern
//!
//! Defines the single operation the conversation loop needs from a language
//! model: given the messages so far and the tools on offer, either answer or
//! ask for tool calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatloop_core::backend::{BackendResponse, ModelBackend};
//!
//! let backend = OpenAiBackend::from_settings(&settings)?;
//!
//! match backend.complete(history.messages(), &registry.definitions()).await? {
//!     BackendResponse::Message { content } => println!("{content}"),
//!     BackendResponse::ToolCalls { calls } => { /* dispatch */ }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCallRequest, ToolDefinition};

/// Response from one backend round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendResponse {
    /// Plain answer, no further tool calls requested
    Message { content: String },

    /// One or more tool calls, in the order they should be resolved
    ToolCalls { calls: Vec<ToolCallRequest> },
}

impl BackendResponse {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    pub const fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self::ToolCalls { calls }
    }
}

/// Strategy trait for model backends
///
/// Implement this trait to add support for new LLM backends.
/// The conversation loop works exclusively through this interface.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Human-readable backend name (e.g., "openai")
    fn name(&self) -> &str;

    /// Run one round against the model
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<BackendResponse>;

    /// Check if the backend is reachable and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
