//! End-to-end behaviour of the conversation loop against a scripted backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chatloop_core::json_object;
use chatloop_core::testing::SequentialBackend;
use chatloop_core::{
    BackendResponse, ChatError, ConversationHistory, ConversationLoop, FnTool, LoopConfig,
    ParameterSchema, Role, ToolCallRequest, ToolDefinition, ToolOutput, ToolRegistry,
};
use serde_json::Value;

fn registry() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools
        .register(FnTool::new(
            ToolDefinition::new("lookup", "Look a key up")
                .param(ParameterSchema::required("key", "string", "Key")),
            |args| async move {
                let key = args.get("key").and_then(Value::as_str).unwrap_or_default().to_string();
                Ok::<ToolOutput, ChatError>(json_object!({ "value": key.to_uppercase() }))
            },
        ))
        .unwrap();
    tools
        .register(FnTool::new(ToolDefinition::new("broken", "Always fails"), |_| async {
            Err::<ToolOutput, _>(ChatError::ToolExecution("disk on fire".into()))
        }))
        .unwrap();
    tools
}

fn call(id: &str, name: &str, key: &str) -> ToolCallRequest {
    ToolCallRequest::new(id, name, json_object!({ "key": key }))
}

fn base_history() -> ConversationHistory {
    ConversationHistory::with_system_prompt("You are a test persona.")
}

#[tokio::test]
async fn results_follow_request_order() {
    let backend = Arc::new(SequentialBackend::new(vec![
        BackendResponse::tool_calls(vec![
            call("c1", "lookup", "alpha"),
            call("c2", "lookup", "beta"),
            call("c3", "lookup", "gamma"),
        ]),
        BackendResponse::message("done"),
    ]));
    let chat = ConversationLoop::with_defaults(backend.clone());

    let turn = chat.ask(&base_history(), "go", &registry()).await.unwrap();

    let tool_messages: Vec<_> = turn
        .history
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 3);
    let ids: Vec<_> = tool_messages.iter().map(|m| m.tool_call_id.as_deref().unwrap()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(tool_messages[1].content, r#"{"value":"BETA"}"#);

    // The second backend call already sees all three results
    let second = &backend.requests()[1].messages;
    assert_eq!(second.len(), 6);
    assert_eq!(second.last().unwrap().tool_call_id.as_deref(), Some("c3"));
}

#[tokio::test]
async fn unknown_tool_becomes_error_payload() {
    let backend = Arc::new(SequentialBackend::new(vec![
        BackendResponse::tool_calls(vec![call("c1", "does_not_exist", "x")]),
        BackendResponse::message("Sorry, I could not do that."),
    ]));
    let chat = ConversationLoop::with_defaults(backend);

    let turn = chat.ask(&base_history(), "go", &registry()).await.unwrap();

    assert_eq!(turn.answer, "Sorry, I could not do that.");
    let tool_message = &turn.history.messages()[3];
    let payload: Value = serde_json::from_str(&tool_message.content).unwrap();
    assert_eq!(payload["error"], "Tool not found: does_not_exist");
}

#[tokio::test]
async fn failing_handler_does_not_stop_the_round() {
    let backend = Arc::new(SequentialBackend::new(vec![
        BackendResponse::tool_calls(vec![
            call("c1", "broken", "x"),
            call("c2", "lookup", "after"),
        ]),
        BackendResponse::message("partial success"),
    ]));
    let chat = ConversationLoop::with_defaults(backend);

    let turn = chat.ask(&base_history(), "go", &registry()).await.unwrap();

    let messages = turn.history.messages();
    assert!(messages[3].content.contains("disk on fire"));
    assert_eq!(messages[4].content, r#"{"value":"AFTER"}"#);
    assert_eq!(turn.answer, "partial success");
}

#[tokio::test]
async fn multiple_rounds_then_answer() {
    let backend = Arc::new(SequentialBackend::new(vec![
        BackendResponse::tool_calls(vec![call("r1", "lookup", "one")]),
        BackendResponse::tool_calls(vec![call("r2", "lookup", "two")]),
        BackendResponse::message("two rounds"),
    ]));
    let chat = ConversationLoop::with_defaults(backend.clone());

    let turn = chat.ask(&base_history(), "go", &registry()).await.unwrap();

    assert_eq!(turn.rounds, 2);
    assert_eq!(backend.call_count(), 3);
    assert_eq!(
        turn.history.roles(),
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
        ]
    );
}

#[tokio::test]
async fn round_limit_preserves_exchanged_history() {
    let backend = Arc::new(SequentialBackend::new(vec![
        BackendResponse::tool_calls(vec![call("r1", "lookup", "one")]),
        BackendResponse::tool_calls(vec![call("r2", "lookup", "two")]),
        BackendResponse::tool_calls(vec![call("r3", "lookup", "three")]),
    ]));
    let chat = ConversationLoop::new(
        backend.clone(),
        LoopConfig {
            max_rounds: 2,
            ..LoopConfig::default()
        },
    );

    let err = chat.ask(&base_history(), "go", &registry()).await.unwrap_err();

    let ChatError::LoopExceeded { max_rounds, history } = err else {
        panic!("expected LoopExceeded");
    };
    assert_eq!(max_rounds, 2);
    assert_eq!(backend.call_count(), 3);
    // system, user, then two complete call/result pairs; the unanswered
    // third request is not recorded
    assert_eq!(
        history.roles(),
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
        ]
    );
    let ids: Vec<_> = history
        .messages()
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["r1", "r2"]);
}

#[tokio::test]
async fn zero_round_limit_rejects_first_tool_call() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let tools = ToolRegistry::new()
        .with(FnTool::new(ToolDefinition::new("count", "Counts"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<ToolOutput, ChatError>(json_object!({})) }
        }))
        .unwrap();
    let backend = Arc::new(SequentialBackend::new(vec![BackendResponse::tool_calls(vec![
        ToolCallRequest::new("c1", "count", serde_json::Map::new()),
    ])]));
    let chat = ConversationLoop::new(
        backend,
        LoopConfig {
            max_rounds: 0,
            ..LoopConfig::default()
        },
    );

    let err = chat.ask(&base_history(), "go", &tools).await.unwrap_err();

    assert!(matches!(err, ChatError::LoopExceeded { max_rounds: 0, .. }));
    assert_eq!(err.partial_history().unwrap().len(), 2);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn backend_failure_surfaces_to_caller() {
    let backend = Arc::new(SequentialBackend::from_results(vec![
        Ok(BackendResponse::tool_calls(vec![call("c1", "lookup", "x")])),
        Err(ChatError::Backend("HTTP 500".into())),
    ]));
    let chat = ConversationLoop::with_defaults(backend);
    let history = base_history();

    let err = chat.ask(&history, "go", &registry()).await.unwrap_err();

    assert!(err.is_backend_error());
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn history_replays_into_next_turn() {
    let backend = Arc::new(SequentialBackend::new(vec![
        BackendResponse::tool_calls(vec![call("c1", "lookup", "x")]),
        BackendResponse::message("first"),
        BackendResponse::message("second"),
    ]));
    let chat = ConversationLoop::with_defaults(backend.clone());
    let tools = registry();

    let first = chat.ask(&base_history(), "one", &tools).await.unwrap();
    let second = chat.ask(&first.history, "two", &tools).await.unwrap();

    assert_eq!(second.answer, "second");
    assert_eq!(second.history.len(), first.history.len() + 2);
    assert_eq!(
        &second.history.messages()[..first.history.len()],
        first.history.messages()
    );
    assert_eq!(backend.requests()[2].messages.len(), first.history.len() + 1);
}
