//! # chatloop-core
//!
//! Tool-augmented conversation loop with a pluggable model backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ConversationLoop                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   History   │  │    Tools    │  │   ModelBackend      │  │
//! │  │  (Session)  │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ModelBackend` trait keeps the loop independent of any particular
//! chat-completions API; the `Notifier` trait does the same for tools that
//! alert a human.

pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod notify;
pub mod session;
pub mod testing;
pub mod tool;

pub use backend::{BackendResponse, ModelBackend};
pub use config::{env_lookup, PushoverSettings, Settings};
pub use conversation::{ConversationLoop, LoopConfig, Turn};
pub use error::{ChatError, Result};
pub use message::{ConversationHistory, Message, Role};
pub use notify::{LogNotifier, Notifier};
pub use session::{Session, SessionId};
pub use tool::{
    FnTool, ParameterSchema, Tool, ToolArguments, ToolCallRequest, ToolDefinition, ToolOutput,
    ToolRegistry, ToolResult,
};
