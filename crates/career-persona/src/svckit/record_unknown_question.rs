//! Record Unknown Question Tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use chatloop_core::{
    ChatError, Notifier, ParameterSchema, Result as CoreResult, Tool, ToolArguments,
    ToolDefinition, ToolOutput,
};

use super::{notify_or_log, recorded};

/// Tool for recording questions the persona could not answer
pub struct RecordUnknownQuestionTool {
    notifier: Arc<dyn Notifier>,
}

impl RecordUnknownQuestionTool {
    pub const NAME: &'static str = "record_unknown_question";

    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for RecordUnknownQuestionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Always use this tool to record any question that couldn't be answered as you didn't know the answer",
        )
        .param(ParameterSchema::required(
            "question",
            "string",
            "The question that couldn't be answered",
        ))
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<ToolOutput> {
        let question = arguments
            .get("question")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatError::ToolValidation("question must be a string".into()))?;

        let message = format!("Recording unknown question: {question}");
        notify_or_log(self.notifier.as_ref(), Self::NAME, &message).await;

        Ok(recorded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svckit::test_support::RecordingNotifier;
    use chatloop_core::json_object;

    #[tokio::test]
    async fn test_records_question() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tool = RecordUnknownQuestionTool::new(notifier.clone());

        let output = tool
            .execute(&json_object!({ "question": "What is your favorite color?" }))
            .await
            .unwrap();

        assert_eq!(output, json_object!({ "recorded": "OK" }));
        assert_eq!(
            notifier.sent(),
            vec!["Recording unknown question: What is your favorite color?"]
        );
    }

    #[tokio::test]
    async fn test_failed_push_is_swallowed() {
        let tool = RecordUnknownQuestionTool::new(Arc::new(RecordingNotifier::failing()));
        let output = tool.execute(&json_object!({ "question": "Why?" })).await.unwrap();
        assert_eq!(output["recorded"], "OK");
    }

    #[tokio::test]
    async fn test_non_string_question() {
        let tool = RecordUnknownQuestionTool::new(Arc::new(RecordingNotifier::default()));
        assert!(tool.execute(&json_object!({ "question": ["a"] })).await.is_err());
    }
}
