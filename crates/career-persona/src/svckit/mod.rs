//! Service Kit - Persona Tools
//!
//! Tools that implement `chatloop_core::Tool` for the career persona. Both
//! forward what they record to a `Notifier` and always report success to the
//! model; delivery failures only show up in the logs.

mod record_unknown_question;
mod record_user_details;

pub use record_unknown_question::RecordUnknownQuestionTool;
pub use record_user_details::RecordUserDetailsTool;

use chatloop_core::{json_object, Notifier, ToolOutput};

/// Payload both tools hand back to the model
fn recorded() -> ToolOutput {
    json_object!({ "recorded": "OK" })
}

/// Deliver a notification, logging instead of failing
async fn notify_or_log(notifier: &dyn Notifier, tool: &str, message: &str) {
    if let Err(e) = notifier.notify(message).await {
        tracing::warn!(tool, error = %e, "Failed to send notification");
    }
}
