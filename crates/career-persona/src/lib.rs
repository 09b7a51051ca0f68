//! # career-persona
//!
//! A persona that answers visitors' questions on a person's behalf, using
//! their summary and resume, and records leads for follow-up.
//!
//! ## Tools
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────┐
//! │ record_user_details      │ visitor left an email (name, notes opt.) │
//! │ record_unknown_question  │ persona could not answer a question      │
//! └──────────────────────────┴──────────────────────────────────────────┘
//!            │
//!            ▼
//!        Notifier (Pushover, or log only)
//! ```

pub mod error;
pub mod profile;
pub mod svckit;

use std::sync::Arc;

use chatloop_core::{Notifier, ToolRegistry};

pub use error::{PersonaError, Result};
pub use profile::Profile;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{RecordUnknownQuestionTool, RecordUserDetailsTool};
}

/// Registry holding both persona tools
pub fn career_tools(notifier: Arc<dyn Notifier>) -> chatloop_core::Result<ToolRegistry> {
    ToolRegistry::new()
        .with(tools::RecordUserDetailsTool::new(Arc::clone(&notifier)))?
        .with(tools::RecordUnknownQuestionTool::new(notifier))
}
