//! OpenAI-compatible Model Backend
//!
//! Implementation of `ModelBackend` over the `/chat/completions` endpoint with
//! native function calling. Works with OpenAI itself and with any server that
//! speaks the same wire format (OpenRouter, vLLM, Ollama's `/v1`).

use std::time::Duration;

use async_trait::async_trait;
use chatloop_core::{
    backend::{BackendResponse, ModelBackend},
    error::{ChatError, Result},
    message::Message,
    tool::{ToolArguments, ToolCallRequest, ToolDefinition},
    Settings,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAI backend configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Base URL, without the trailing `/chat/completions`
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// HTTP-level request timeout
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.openai_base_url.clone(),
            api_key: settings.openai_api_key.clone(),
            model: settings.openai_model.clone(),
            timeout: settings.backend_timeout,
        }
    }
}

/// OpenAI-compatible chat-completions backend
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create from configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured HTTP client; `config.timeout` is then up to the caller
    pub fn with_client(mut config: OpenAiConfig, client: reqwest::Client) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { client, config }
    }

    /// Create from process settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(OpenAiConfig::from_settings(settings))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Convert conversation messages to the wire format
    fn to_api_messages(messages: &[Message]) -> Result<Vec<ApiMessage>> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|call| {
                                Ok(ApiToolCall {
                                    id: call.id.clone(),
                                    r#type: "function".into(),
                                    function: ApiFunction {
                                        name: call.name.clone(),
                                        arguments: serde_json::to_string(&call.arguments)?,
                                    },
                                })
                            })
                            .collect::<Result<Vec<_>>>()?,
                    )
                };

                // Assistant turns that only carry tool calls send null content
                let content = if tool_calls.is_some() && m.content.is_empty() {
                    None
                } else {
                    Some(m.content.clone())
                };

                Ok(ApiMessage {
                    role: m.role.to_string(),
                    content,
                    tool_calls,
                    tool_call_id: m.tool_call_id.clone(),
                })
            })
            .collect()
    }

    /// Convert tool definitions to the wire format
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.json_schema(),
                },
            })
            .collect()
    }

    fn build_body(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<Value> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": Self::to_api_messages(messages)?,
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(Self::to_api_tools(tools))?;
        }

        Ok(body)
    }

    /// Interpret a decoded chat-completions response
    fn parse_response(response: ApiResponse) -> Result<BackendResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::MalformedResponse("no choices in response".into()))?;

        let tool_calls = choice.message.tool_calls.unwrap_or_default();
        if !tool_calls.is_empty() {
            let calls = tool_calls
                .into_iter()
                .map(|tc| {
                    Ok(ToolCallRequest::new(
                        tc.id,
                        tc.function.name,
                        parse_arguments(&tc.function.arguments)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(BackendResponse::tool_calls(calls));
        }

        choice
            .message
            .content
            .or(choice.message.refusal)
            .map(BackendResponse::message)
            .ok_or_else(|| {
                ChatError::MalformedResponse("response has neither content nor tool calls".into())
            })
    }

    fn status_error(status: u16, body: String) -> ChatError {
        match status {
            401 | 403 => ChatError::Auth("Invalid API key or insufficient permissions".into()),
            429 => ChatError::RateLimited(body),
            _ => ChatError::Backend(format!("HTTP {status}: {body}")),
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::BackendTimeout {
                secs: self.config.timeout.map_or(0, |t| t.as_secs()),
            }
        } else if err.is_connect() {
            ChatError::BackendUnavailable(err.to_string())
        } else {
            ChatError::Backend(err.to_string())
        }
    }
}

/// Parse the JSON-encoded argument string of a tool call
fn parse_arguments(raw: &str) -> Result<ToolArguments> {
    if raw.trim().is_empty() {
        return Ok(ToolArguments::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ChatError::MalformedResponse(format!(
            "tool arguments must be a JSON object, got {other}"
        ))),
        Err(e) => Err(ChatError::MalformedResponse(format!(
            "tool arguments are not valid JSON: {e}"
        ))),
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<BackendResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_body(messages, tools)?;

        tracing::debug!(model = %self.config.model, messages = messages.len(), tools = tools.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %error_body, "Backend returned error");
            return Err(Self::status_error(status.as_u16(), error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(format!("failed to parse response: {e}")))?;

        Self::parse_response(api_response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        match self.client.get(&url).bearer_auth(&self.config.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Backend health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}
