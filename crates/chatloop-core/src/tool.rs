//! Tool System
//!
//! Tools are registered once at startup under a unique name and looked up by
//! that name when the backend requests a call. Dispatch never fails: a missing
//! tool, invalid arguments, a handler error, a panic, or a timeout all turn
//! into a result whose payload is `{"error": "<reason>"}`.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ChatError, Result};

/// Arguments passed to a tool handler
pub type ToolArguments = Map<String, Value>;

/// Payload returned by a tool handler
pub type ToolOutput = Map<String, Value>;

/// Tool call request from the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Request identifier assigned by the backend
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of dispatching one tool call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Matches the id of the originating request
    pub id: String,

    /// Result payload
    pub payload: ToolOutput,
}

impl ToolResult {
    pub const fn new(id: String, payload: ToolOutput) -> Self {
        Self { id, payload }
    }

    /// Error-bearing result for a call that could not be served
    pub fn error(id: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("error".into(), Value::String(reason.into()));
        Self {
            id: id.into(),
            payload,
        }
    }

    pub fn is_error(&self) -> bool {
        self.payload.contains_key("error")
    }

    /// JSON text of the payload, as sent back to the backend
    pub fn content(&self) -> String {
        Value::Object(self.payload.clone()).to_string()
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            enum_values: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    #[must_use]
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// Tool definition advertised to the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// JSON Schema object for the parameters
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if let Some(values) = &param.enum_values {
                prop["enum"] = Value::Array(values.clone());
            }
            properties.insert(param.name.clone(), prop);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Definition advertised to the backend
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput>;

    /// Validate arguments before execution
    fn validate(&self, arguments: &ToolArguments) -> Result<()> {
        let definition = self.definition();

        for param in &definition.parameters {
            match arguments.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ChatError::ToolValidation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    if let Some(allowed) = &param.enum_values {
                        if !allowed.contains(value) {
                            return Err(ChatError::ToolValidation(format!(
                                "Parameter {} must be one of {}",
                                param.name,
                                Value::Array(allowed.clone())
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

type Handler = dyn Fn(ToolArguments) -> BoxFuture<'static, Result<ToolOutput>> + Send + Sync;

/// A tool backed by an async closure
pub struct FnTool {
    definition: ToolDefinition,
    handler: Box<Handler>,
}

impl FnTool {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        Self {
            definition,
            handler: Box::new(move |args| handler(args).boxed()),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput> {
        (self.handler)(arguments.clone()).await
    }
}

/// Registry for available tools.
///
/// Built once, then shared read-only. Definitions keep registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.definition().name;
        if self.index.contains_key(&name) {
            return Err(ChatError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style registration
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Definitions of every registered tool, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call, surfacing dispatch failures as errors
    pub async fn execute(
        &self,
        call: &ToolCallRequest,
        timeout: Option<Duration>,
    ) -> Result<ToolOutput> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ChatError::ToolNotFound(call.name.clone()))?;

        tool.validate(&call.arguments)?;

        let run = AssertUnwindSafe(tool.execute(&call.arguments)).catch_unwind();
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                ChatError::ToolTimeout {
                    name: call.name.clone(),
                    secs: limit.as_secs(),
                }
            })?,
            None => run.await,
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.is_tool_dispatch_error() => Err(e),
            Ok(Err(e)) => Err(ChatError::ToolExecution(e.to_string())),
            Err(_) => Err(ChatError::ToolExecution(format!(
                "handler for '{}' panicked",
                call.name
            ))),
        }
    }

    /// Dispatch a tool call. Never fails; errors become an error payload.
    pub async fn dispatch(&self, call: &ToolCallRequest, timeout: Option<Duration>) -> ToolResult {
        tracing::info!(tool = %call.name, id = %call.id, "Tool called");

        match self.execute(call, timeout).await {
            Ok(output) => ToolResult::new(call.id.clone(), output),
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "Tool dispatch failed");
                ToolResult::error(call.id.clone(), e.to_string())
            }
        }
    }

    /// Dispatch a round of calls concurrently; results keep request order
    pub async fn dispatch_all(
        &self,
        calls: &[ToolCallRequest],
        timeout: Option<Duration>,
    ) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.dispatch(call, timeout))).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Build a JSON object from a `json!` value, panicking on non-objects.
///
/// Intended for tests and literals.
#[macro_export]
macro_rules! json_object {
    ($($tt:tt)*) => {
        match ::serde_json::json!($($tt)*) {
            ::serde_json::Value::Object(map) => map,
            other => panic!("expected a JSON object, got {other}"),
        }
    };
}
