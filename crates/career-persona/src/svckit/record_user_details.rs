//! Record User Details Tool
//!
//! Captures contact details from a visitor who wants to get in touch.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use chatloop_core::{
    ChatError, Notifier, ParameterSchema, Result as CoreResult, Tool, ToolArguments,
    ToolDefinition, ToolOutput,
};

use super::{notify_or_log, recorded};

const NOT_PROVIDED: &str = "not provided";

/// Tool for recording a visitor's email and context
pub struct RecordUserDetailsTool {
    notifier: Arc<dyn Notifier>,
}

impl RecordUserDetailsTool {
    pub const NAME: &'static str = "record_user_details";

    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

fn string_arg<'a>(arguments: &'a ToolArguments, key: &str) -> CoreResult<Option<&'a str>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim()).filter(|s| !s.is_empty())),
        Some(other) => Err(ChatError::ToolValidation(format!(
            "Parameter {key} must be a string, got {other}"
        ))),
    }
}

#[async_trait]
impl Tool for RecordUserDetailsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Use this tool to record that a user is interested in being in touch and provided an email address",
        )
        .param(ParameterSchema::required(
            "email",
            "string",
            "The email address of this user",
        ))
        .param(ParameterSchema::optional(
            "name",
            "string",
            "The user's name, if they provided it",
        ))
        .param(ParameterSchema::optional(
            "notes",
            "string",
            "Any additional information about the conversation that's worth recording to give context",
        ))
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<ToolOutput> {
        let email = string_arg(arguments, "email")?
            .ok_or_else(|| ChatError::ToolValidation("email must not be empty".into()))?;
        let name = string_arg(arguments, "name")?.unwrap_or(NOT_PROVIDED);
        let notes = string_arg(arguments, "notes")?.unwrap_or(NOT_PROVIDED);

        let message = format!("Recording user details: {email}, {name} and notes: {notes}");
        notify_or_log(self.notifier.as_ref(), Self::NAME, &message).await;

        Ok(recorded())
    }
}
