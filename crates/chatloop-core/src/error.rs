//! Error Types

use thiserror::Error;

use crate::message::ConversationHistory;

/// Result type alias for conversation operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Conversation error types
#[derive(Error, Debug)]
pub enum ChatError {
    /// Model backend returned an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend unreachable
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend call did not finish in time
    #[error("Backend timed out after {secs}s")]
    BackendTimeout { secs: u64 },

    /// Backend answered with something we cannot interpret
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Tool did not finish in time
    #[error("Tool '{name}' timed out after {secs}s")]
    ToolTimeout { name: String, secs: u64 },

    /// A tool with this name is already registered
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    /// Tool-call rounds exceeded the configured maximum.
    ///
    /// Carries the history exchanged up to the limit.
    #[error("Maximum tool-call rounds ({max_rounds}) exceeded")]
    LoopExceeded {
        max_rounds: usize,
        history: Box<ConversationHistory>,
    },

    /// History handed to the loop does not start with a system message
    #[error("Conversation history must start with a system message")]
    MissingSystemPrompt,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Whether this error came from the model backend boundary
    pub const fn is_backend_error(&self) -> bool {
        matches!(
            self,
            Self::Backend(_)
                | Self::BackendUnavailable(_)
                | Self::BackendTimeout { .. }
                | Self::MalformedResponse(_)
                | Self::RateLimited(_)
                | Self::Auth(_)
        )
    }

    /// Whether this error is recovered locally into an error-bearing tool result
    pub const fn is_tool_dispatch_error(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound(_)
                | Self::ToolValidation(_)
                | Self::ToolExecution(_)
                | Self::ToolTimeout { .. }
        )
    }

    /// Check if retrying the whole turn may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable(_)
                | Self::BackendTimeout { .. }
                | Self::RateLimited(_)
                | Self::Io(_)
        )
    }

    /// History preserved by a failed turn, if any
    pub fn partial_history(&self) -> Option<&ConversationHistory> {
        match self {
            Self::LoopExceeded { history, .. } => Some(history),
            _ => None,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(msg) => format!("The AI service encountered an error: {msg}"),
            Self::BackendUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::BackendTimeout { .. } => {
                "The AI service took too long to answer. Please try again.".into()
            }
            Self::MalformedResponse(_) => {
                "The AI service returned a response that could not be understood.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::LoopExceeded { .. } => {
                "The request needed too many tool calls. Please try a simpler question.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your API key.".into(),
            Self::Configuration(msg) => format!("Configuration problem: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
