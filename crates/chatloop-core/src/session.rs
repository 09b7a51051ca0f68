//! Session Management
//!
//! A session owns one conversation history. Each caller keeps its own
//! session; nothing here is shared between sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::{ConversationLoop, Turn};
use crate::error::Result;
use crate::message::{ConversationHistory, Role};
use crate::tool::ToolRegistry;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last completed turn
    pub updated_at: DateTime<Utc>,

    history: ConversationHistory,
}

impl Session {
    /// Create with system prompt
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            updated_at: now,
            history: ConversationHistory::with_system_prompt(system_prompt),
        }
    }

    /// Run one turn against this session's history.
    ///
    /// The stored history only changes when the turn succeeds.
    pub async fn ask(
        &mut self,
        chat: &ConversationLoop,
        user_message: impl Into<String>,
        tools: &ToolRegistry,
    ) -> Result<String> {
        let Turn {
            answer,
            history,
            rounds,
        } = chat.ask(&self.history, user_message, tools).await?;

        tracing::debug!(session = %self.id, rounds, "Session turn stored");
        self.history = history;
        self.updated_at = Utc::now();
        Ok(answer)
    }

    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Completed user turns so far
    pub fn turn_count(&self) -> usize {
        self.history
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.history.len()
    }
}
