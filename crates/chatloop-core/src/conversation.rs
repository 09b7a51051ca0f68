//! Conversation Loop
//!
//! Drives one turn: append the user message, ask the backend, dispatch any
//! requested tools, feed the results back, and repeat until the backend gives
//! a plain answer.
//!
//! ```text
//!                 tool calls
//!   AwaitingModel ──────────▶ DispatchingTools
//!        │   ▲                      │
//!        │   └──────────────────────┘
//!        │ message     all results appended
//!        ▼
//!      Done
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BackendResponse, ModelBackend};
use crate::config::DEFAULT_MAX_ROUNDS;
use crate::error::{ChatError, Result};
use crate::message::{ConversationHistory, Message};
use crate::tool::{ToolCallRequest, ToolDefinition, ToolRegistry};

/// Limits applied to every turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum tool-call rounds per turn
    pub max_rounds: usize,

    /// Per backend call
    pub backend_timeout: Option<Duration>,

    /// Per tool invocation
    pub tool_timeout: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            backend_timeout: None,
            tool_timeout: None,
        }
    }
}

/// Outcome of a completed turn
#[derive(Clone, Debug)]
pub struct Turn {
    /// Final natural-language answer
    pub answer: String,

    /// Input history extended with everything exchanged during the turn
    pub history: ConversationHistory,

    /// Tool-call rounds the turn needed
    pub rounds: usize,
}

#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<ToolCallRequest>),
    Done(String),
}

/// Mediates between a model backend and locally registered tools
pub struct ConversationLoop {
    backend: Arc<dyn ModelBackend>,
    config: LoopConfig,
}

impl ConversationLoop {
    pub fn new(backend: Arc<dyn ModelBackend>, config: LoopConfig) -> Self {
        Self { backend, config }
    }

    /// Create with default limits
    pub fn with_defaults(backend: Arc<dyn ModelBackend>) -> Self {
        Self::new(backend, LoopConfig::default())
    }

    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn ModelBackend {
        self.backend.as_ref()
    }

    /// Run one turn.
    ///
    /// `history` must start with a system message and is never modified; the
    /// extended history comes back in the [`Turn`]. When the round limit is hit
    /// the history exchanged so far travels inside [`ChatError::LoopExceeded`].
    pub async fn ask(
        &self,
        history: &ConversationHistory,
        user_message: impl Into<String>,
        tools: &ToolRegistry,
    ) -> Result<Turn> {
        if !history.starts_with_system() {
            return Err(ChatError::MissingSystemPrompt);
        }

        let mut history = history.clone();
        history.push(Message::user(user_message));

        let definitions = tools.definitions();
        let mut rounds = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    match self.complete(&history, &definitions, rounds).await? {
                        BackendResponse::Message { content } => {
                            history.push(Message::assistant(content.clone()));
                            LoopState::Done(content)
                        }
                        BackendResponse::ToolCalls { calls } => {
                            check_calls(&calls)?;

                            if rounds >= self.config.max_rounds {
                                tracing::warn!(
                                    max_rounds = self.config.max_rounds,
                                    "Tool-call round limit reached"
                                );
                                return Err(ChatError::LoopExceeded {
                                    max_rounds: self.config.max_rounds,
                                    history: Box::new(history),
                                });
                            }

                            rounds += 1;
                            history.push(Message::assistant_tool_calls(calls.clone()));
                            LoopState::DispatchingTools(calls)
                        }
                    }
                }
                LoopState::DispatchingTools(calls) => {
                    tracing::debug!(round = rounds, calls = calls.len(), "Dispatching tools");

                    let results = tools.dispatch_all(&calls, self.config.tool_timeout).await;
                    for result in &results {
                        history.push(Message::tool(result));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(answer) => {
                    tracing::debug!(rounds, messages = history.len(), "Turn complete");
                    return Ok(Turn {
                        answer,
                        history,
                        rounds,
                    });
                }
            };
        }
    }

    async fn complete(
        &self,
        history: &ConversationHistory,
        tools: &[ToolDefinition],
        round: usize,
    ) -> Result<BackendResponse> {
        tracing::debug!(backend = self.backend.name(), round, "Calling backend");

        let call = self.backend.complete(history.messages(), tools);
        match self.config.backend_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ChatError::BackendTimeout {
                    secs: limit.as_secs(),
                })?,
            None => call.await,
        }
    }
}

// Every result must map back to exactly one request
fn check_calls(calls: &[ToolCallRequest]) -> Result<()> {
    if calls.is_empty() {
        return Err(ChatError::MalformedResponse(
            "tool_calls response without any calls".into(),
        ));
    }

    let mut seen = HashSet::new();
    for call in calls {
        if !seen.insert(call.id.as_str()) {
            return Err(ChatError::MalformedResponse(format!(
                "duplicate tool call id '{}'",
                call.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_object;
    use crate::message::Role;
    use crate::testing::SequentialBackend;
    use crate::tool::{FnTool, ParameterSchema, ToolOutput};

    fn record_question_registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(FnTool::new(
                ToolDefinition::new("record_question", "Record a question")
                    .param(ParameterSchema::required("question", "string", "The question")),
                |_| async { Ok::<ToolOutput, ChatError>(json_object!({"recorded": "OK"})) },
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_question_scenario() {
        let backend = Arc::new(SequentialBackend::new(vec![
            BackendResponse::tool_calls(vec![ToolCallRequest::new(
                "call_1",
                "record_question",
                json_object!({"question": "What is the meaning of life?"}),
            )]),
            BackendResponse::message("I've recorded that for later."),
        ]));
        let chat = ConversationLoop::with_defaults(backend.clone());
        let history = ConversationHistory::with_system_prompt("You are helpful.");

        let turn = chat
            .ask(&history, "What is the meaning of life?", &record_question_registry())
            .await
            .unwrap();

        assert_eq!(turn.answer, "I've recorded that for later.");
        assert_eq!(turn.rounds, 1);
        assert_eq!(
            turn.history.roles(),
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );

        let messages = turn.history.messages();
        assert_eq!(messages[2].tool_calls[0].name, "record_question");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[3].content, r#"{"recorded":"OK"}"#);
        assert_eq!(messages[4].content, "I've recorded that for later.");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_plain_answer_single_round_trip() {
        let backend = Arc::new(SequentialBackend::new(vec![BackendResponse::message("Hello!")]));
        let chat = ConversationLoop::with_defaults(backend.clone());
        let history = ConversationHistory::with_system_prompt("sys");

        let turn = chat.ask(&history, "Hi", &ToolRegistry::new()).await.unwrap();

        assert_eq!(turn.answer, "Hello!");
        assert_eq!(turn.rounds, 0);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(history.len(), 1, "input history must not change");
    }

    #[tokio::test]
    async fn test_backend_sees_tool_definitions() {
        let backend = Arc::new(SequentialBackend::new(vec![BackendResponse::message("ok")]));
        let chat = ConversationLoop::with_defaults(backend.clone());
        let history = ConversationHistory::with_system_prompt("sys");

        chat.ask(&history, "Hi", &record_question_registry()).await.unwrap();

        assert_eq!(backend.tool_names(0), vec!["record_question"]);
    }

    #[tokio::test]
    async fn test_missing_system_prompt_rejected() {
        let backend = Arc::new(SequentialBackend::new(vec![BackendResponse::message("Hello!")]));
        let chat = ConversationLoop::with_defaults(backend.clone());

        let err = chat
            .ask(&ConversationHistory::new(), "Hi", &ToolRegistry::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::MissingSystemPrompt));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_tool_call_list_is_malformed() {
        let backend = Arc::new(SequentialBackend::new(vec![BackendResponse::tool_calls(vec![])]));
        let chat = ConversationLoop::with_defaults(backend);
        let history = ConversationHistory::with_system_prompt("sys");

        let err = chat.ask(&history, "Hi", &ToolRegistry::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
        assert!(err.is_backend_error());
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_are_malformed() {
        let call = ToolCallRequest::new("same", "record_question", json_object!({"question": "q"}));
        let backend = Arc::new(SequentialBackend::new(vec![BackendResponse::tool_calls(vec![
            call.clone(),
            call,
        ])]));
        let chat = ConversationLoop::with_defaults(backend);
        let history = ConversationHistory::with_system_prompt("sys");

        let err = chat
            .ask(&history, "Hi", &record_question_registry())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(msg) if msg.contains("same")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout() {
        let backend = Arc::new(
            SequentialBackend::new(vec![BackendResponse::message("late")])
                .with_delay(Duration::from_secs(300)),
        );
        let chat = ConversationLoop::new(
            backend,
            LoopConfig {
                backend_timeout: Some(Duration::from_secs(10)),
                ..LoopConfig::default()
            },
        );
        let history = ConversationHistory::with_system_prompt("sys");

        let err = chat.ask(&history, "Hi", &ToolRegistry::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::BackendTimeout { secs: 10 }));
    }
}
