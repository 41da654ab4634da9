//! HTTP client for an OpenAI-compatible local chat-completion server.
//!
//! Ollama serves this dialect at `/v1/chat/completions`; tool calling
//! uses the function-call format. The client is a pure translation
//! layer: conversation and declarations go out, text or tool calls come
//! back, and no business logic happens here.

use crate::config::AnalystConfig;
use crate::error::RuntimeError;
use crate::runtime::ModelRuntime;
use crate::tools::ToolDefinition;
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client for the configured model runtime.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    request_timeout: Duration,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload<'a>>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    r#type: &'a str,
    function: FunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionPayload<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    r#type: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallPayload>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl RuntimeClient {
    /// Create a client from the process configuration.
    pub fn new(config: &AnalystConfig) -> Self {
        Self {
            base_url: config.runtime_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens_per_turn,
            temperature: config.temperature,
            request_timeout: Duration::from_millis(config.model_timeout_ms),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelRuntime for RuntimeClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, RuntimeError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let tool_payloads: Option<Vec<ToolPayload>> = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| ToolPayload {
                        r#type: "function",
                        function: FunctionPayload {
                            name: &t.name,
                            description: &t.description,
                            parameters: &t.parameters,
                        },
                    })
                    .collect(),
            )
        };

        let request = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(to_payload).collect(),
            tools: tool_payloads,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!("Model request: {} messages to {}", messages.len(), self.model);

        let resp = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| RuntimeError::Unavailable {
                url: self.base_url.clone(),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RuntimeError::Protocol(format!(
                "runtime returned {status}: {body}"
            )));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| RuntimeError::Protocol(format!("undecodable response: {e}")))?;

        parse_reply(body)
    }
}

/// Convert one conversation turn into the wire shape.
fn to_payload(message: &ChatMessage) -> MessagePayload {
    let role = match message.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    };

    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|tc| ToolCallPayload {
                    id: tc.id.clone(),
                    r#type: "function".into(),
                    function: FunctionCallPayload {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    // An assistant turn that only carries tool calls sends null content.
    let content = if message.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(message.content.clone())
    };

    MessagePayload {
        role: role.into(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

/// Turn the raw response body into a [`ModelReply`].
///
/// Argument strings that are not valid JSON degrade to null, which the
/// registry rejects as a validation error; ids the runtime omitted are
/// synthesized so call/result pairing still holds.
fn parse_reply(body: ChatResponse) -> Result<ModelReply, RuntimeError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RuntimeError::Protocol("runtime returned no choices".into()))?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| {
            let arguments: serde_json::Value =
                serde_json::from_str(&tc.function.arguments).unwrap_or_default();
            let id = if tc.id.is_empty() {
                format!("call_{}", ulid::Ulid::new())
            } else {
                tc.id
            };
            ToolCall {
                id,
                name: tc.function.name,
                arguments,
            }
        })
        .collect();

    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(ModelReply {
        content: choice.message.content,
        tool_calls,
        usage,
    })
}
