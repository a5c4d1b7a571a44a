//! OpenAI Chat Completions provider.
//!
//! Streams `/chat/completions` over SSE, either against an OpenAI-compatible
//! base URL or an Azure OpenAI deployment.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_stream::StreamExt;
use tracing::{debug, trace};

use llmstxt_core::config::ResolvedConfig;
use llmstxt_core::types::{Message, RequestOptions, ToolsType};

use crate::sse::parse_response;
use crate::{ChatChunk, ChatProvider, ChatRequest, ChatStream, ChunkUsage, ToolCallFragment};

/// Where requests go and how they authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `{base_url}/chat/completions` with a bearer token.
    OpenAi { base_url: String },
    /// `{endpoint}/openai/deployments/{deployment}/chat/completions` with an
    /// `api-key` header.
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

pub struct OpenAiProvider {
    endpoint: Endpoint,
    api_key: String,
    provider_id: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn openai(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::OpenAi {
                base_url: base_url.trim_end_matches('/').to_string(),
            },
            api_key: api_key.into(),
            provider_id: "openai".into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn azure(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Endpoint::Azure {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                deployment: deployment.into(),
                api_version: api_version.into(),
            },
            api_key: api_key.into(),
            provider_id: "azure".into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build the provider described by resolved config.
    pub fn from_config(config: &ResolvedConfig) -> anyhow::Result<Self> {
        let Some(api_key) = config.api_key.clone() else {
            anyhow::bail!("API key is required. Set OPENAI_API_KEY or provide apiKey in the config file.");
        };
        Ok(match &config.azure {
            Some(azure) => Self::azure(
                &config.base_url,
                api_key,
                azure.deployment.clone(),
                azure.api_version.clone(),
            ),
            None => Self::openai(&config.base_url, api_key),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Full request URL, without the query string.
    pub fn completions_url(&self) -> String {
        match &self.endpoint {
            Endpoint::OpenAi { base_url } => format!("{base_url}/chat/completions"),
            Endpoint::Azure {
                endpoint,
                deployment,
                ..
            } => format!("{endpoint}/openai/deployments/{deployment}/chat/completions"),
        }
    }
}

// --- OpenAI request/response types ---

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    stream: bool,
    #[serde(flatten)]
    options: &'a RequestOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [Value]>,
}

impl<'a> OpenAiRequest<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        let descriptors = (!request.tools.is_empty()).then_some(request.tools.as_slice());
        let (tools, functions) = match request.tools_type {
            ToolsType::ToolCall => (descriptors, None),
            ToolsType::FunctionCall => (None, descriptors),
        };
        Self {
            model: &request.model,
            messages: format_messages(&request.messages, request.tools_type),
            stream: true,
            options: &request.options,
            tools,
            functions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
    /// Legacy single-call shape.
    #[serde(default)]
    function_call: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Decode one SSE `data` payload into a chunk.
///
/// Returns `Ok(None)` for payloads that carry nothing the caller uses.
fn parse_chunk(data: &str) -> anyhow::Result<Option<ChatChunk>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| anyhow::anyhow!("Failed to decode stream chunk: {e}"))?;

    if let Some(error) = chunk.error {
        anyhow::bail!("OpenAI stream error: {}", error.message);
    }

    let usage = chunk.usage.map(|u| ChunkUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
    });

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(usage.map(|usage| ChatChunk {
            usage: Some(usage),
            ..Default::default()
        }));
    };

    let mut tool_calls: Vec<ToolCallFragment> = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| {
            let Some(index) = tc.index else {
                trace!(id = ?tc.id, "Skipping tool call fragment without index");
                return None;
            };
            let function = tc.function.unwrap_or_default();
            Some(ToolCallFragment {
                index,
                id: tc.id,
                name: function.name,
                arguments: function.arguments,
            })
        })
        .collect();

    if let Some(function) = choice.delta.function_call {
        tool_calls.push(ToolCallFragment {
            index: 0,
            id: None,
            name: function.name,
            arguments: function.arguments,
        });
    }

    Ok(Some(ChatChunk {
        content: choice.delta.content.filter(|c| !c.is_empty()),
        tool_calls,
        finish_reason: choice.finish_reason,
        usage,
    }))
}

/// Encode history for the wire, in the shape `tools_type` expects.
///
/// The legacy function-call protocol allows one call per assistant message,
/// so an assistant turn with several calls is split into one assistant
/// message per call, each followed by its result.
pub fn format_messages(messages: &[Message], tools_type: ToolsType) -> Vec<Value> {
    match tools_type {
        ToolsType::ToolCall => messages.iter().map(format_tool_call_message).collect(),
        ToolsType::FunctionCall => format_function_call_messages(messages),
    }
}

fn format_tool_call_message(message: &Message) -> Value {
    match message {
        Message::System { content } => json!({ "role": "system", "content": content }),
        Message::User { content } => json!({ "role": "user", "content": content }),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut msg = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                msg["tool_calls"] = tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": { "name": tc.name, "arguments": tc.arguments },
                        })
                    })
                    .collect();
            }
            msg
        }
        Message::Tool {
            tool_call_id,
            content,
            ..
        } => json!({ "role": "tool", "tool_call_id": tool_call_id, "content": content }),
    }
}

fn format_function_call_messages(messages: &[Message]) -> Vec<Value> {
    let results: HashMap<&str, &Message> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Tool { tool_call_id, .. } => Some((tool_call_id.as_str(), m)),
            _ => None,
        })
        .collect();

    let function_result = |m: &Message| match m {
        Message::Tool { name, content, .. } => {
            json!({ "role": "function", "name": name, "content": content })
        }
        _ => Value::Null,
    };

    let mut out = Vec::new();
    let mut placed: Vec<&str> = Vec::new();

    for message in messages {
        match message {
            Message::Assistant {
                content,
                tool_calls,
            } if !tool_calls.is_empty() => {
                for (i, tc) in tool_calls.iter().enumerate() {
                    let content = if i == 0 { content.clone() } else { None };
                    out.push(json!({
                        "role": "assistant",
                        "content": content,
                        "function_call": { "name": tc.name, "arguments": tc.arguments },
                    }));
                    if let Some(result) = results.get(tc.id.as_str()) {
                        out.push(function_result(*result));
                        placed.push(tc.id.as_str());
                    }
                }
            }
            Message::Tool { tool_call_id, .. } => {
                if !placed.contains(&tool_call_id.as_str()) {
                    out.push(function_result(message));
                }
            }
            other => out.push(format_tool_call_message(other)),
        }
    }

    out
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.provider_id
    }

    async fn stream(&self, request: &ChatRequest) -> anyhow::Result<ChatStream> {
        let body = OpenAiRequest::from_request(request);
        let url = self.completions_url();

        debug!(
            provider = %self.provider_id,
            model = %request.model,
            url = %url,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Streaming chat completion"
        );

        let mut req_builder = self
            .client
            .post(&url)
            .header("content-type", "application/json");

        req_builder = match &self.endpoint {
            Endpoint::OpenAi { .. } => {
                req_builder.header("authorization", format!("Bearer {}", self.api_key))
            }
            Endpoint::Azure { api_version, .. } => req_builder
                .header("api-key", &self.api_key)
                .query(&[("api-version", api_version.as_str())]),
        };

        let response = req_builder.json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {status}: {body}");
        }

        let sse_stream = Box::pin(parse_response(response));

        let chunk_stream = futures::stream::unfold(sse_stream, |mut sse| async move {
            loop {
                let event = match sse.next().await? {
                    Ok(event) => event,
                    Err(e) => return Some((Err(e), sse)),
                };

                let data = event.data.trim();
                // OpenAI terminates with "data: [DONE]"
                if data == "[DONE]" {
                    return None;
                }

                match parse_chunk(data) {
                    Ok(Some(chunk)) => return Some((Ok(chunk), sse)),
                    Ok(None) => {
                        trace!(data, "Skipping empty chunk");
                        continue;
                    }
                    Err(e) => return Some((Err(e), sse)),
                }
            }
        });

        Ok(Box::pin(chunk_stream))
    }
}
