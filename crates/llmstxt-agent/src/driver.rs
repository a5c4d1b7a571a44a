//! Conversation driver: stream, accumulate, dispatch, resubmit.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use llmstxt_core::config::ResolvedConfig;
use llmstxt_core::types::{Message, RequestOptions, ToolsType};
use llmstxt_providers::{ChatProvider, ChatRequest};

use crate::accumulator::ToolCallAccumulator;
use crate::dispatcher::ToolDispatcher;
use crate::events::{ChatEvent, EventChannel};

/// Failures that end a conversation. The `Display` text is the payload of
/// the `error` event.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Failed to open model stream: {0}")]
    StreamOpen(String),

    #[error("Model stream failed: {0}")]
    Stream(String),

    #[error("tool round limit of {0} exceeded")]
    RoundLimit(u32),

    #[error("Conversation task failed: {0}")]
    Task(String),
}

/// Per-conversation request settings.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub model: String,
    pub tools_type: ToolsType,
    pub options: RequestOptions,
    /// Maximum number of streams per conversation. `None` is unbounded.
    pub max_rounds: Option<u32>,
}

impl DriverSettings {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            model: config.model.clone(),
            tools_type: config.tools_type,
            options: config.options.clone(),
            max_rounds: config.max_rounds,
        }
    }
}

/// What a finished conversation produced.
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    /// Full history, ending with the final assistant reply when it had text.
    pub messages: Vec<Message>,
    /// Text of the last stream.
    pub final_text: String,
    /// Number of streams opened.
    pub rounds: u32,
}

/// A conversation running in the background.
pub struct ConversationHandle {
    pub events: mpsc::UnboundedReceiver<ChatEvent>,
    pub task: JoinHandle<Result<ConversationOutcome, AgentError>>,
}

impl ConversationHandle {
    /// Wait for the task, mapping a panicked or cancelled task to an error.
    pub async fn join(self) -> Result<ConversationOutcome, AgentError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(AgentError::Task(e.to_string())),
        }
    }
}

pub struct ConversationDriver {
    provider: Arc<dyn ChatProvider>,
    dispatcher: ToolDispatcher,
    settings: DriverSettings,
}

impl ConversationDriver {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        dispatcher: ToolDispatcher,
        settings: DriverSettings,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    fn fail(&self, events: &EventChannel, err: AgentError) -> AgentError {
        error!(%err, provider = %self.provider.id(), "Conversation failed");
        events.emit(ChatEvent::Error(err.to_string()));
        err
    }

    /// Run the conversation to completion, emitting events as it goes.
    ///
    /// Exactly one terminal event is emitted before this returns.
    pub async fn run(
        &self,
        history: Vec<Message>,
        events: &EventChannel,
    ) -> Result<ConversationOutcome, AgentError> {
        let tools = self.dispatcher.registry().list_tools(self.settings.tools_type);
        let mut messages = history;
        let mut rounds: u32 = 0;

        loop {
            rounds += 1;
            debug!(round = rounds, messages = messages.len(), "Opening model stream");

            let request = ChatRequest {
                model: self.settings.model.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                tools_type: self.settings.tools_type,
                options: self.settings.options.clone(),
            };

            let mut stream = match self.provider.stream(&request).await {
                Ok(s) => s,
                Err(e) => return Err(self.fail(events, AgentError::StreamOpen(format!("{e:#}")))),
            };

            let mut text = String::new();
            let mut calls = ToolCallAccumulator::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => return Err(self.fail(events, AgentError::Stream(format!("{e:#}")))),
                };

                if let Some(content) = chunk.content {
                    text.push_str(&content);
                    events.data(content);
                }
                for fragment in &chunk.tool_calls {
                    calls.ingest(fragment);
                }
                if let Some(usage) = chunk.usage {
                    debug!(
                        round = rounds,
                        prompt_tokens = ?usage.prompt_tokens,
                        completion_tokens = ?usage.completion_tokens,
                        "Token usage"
                    );
                }
            }

            if !calls.has_tool_calls() {
                info!(rounds, "Conversation finished");
                if !text.is_empty() {
                    messages.push(Message::Assistant {
                        content: Some(text.clone()),
                        tool_calls: Vec::new(),
                    });
                }
                events.emit(ChatEvent::End);
                return Ok(ConversationOutcome {
                    messages,
                    final_text: text,
                    rounds,
                });
            }

            if let Some(max) = self.settings.max_rounds {
                if rounds >= max {
                    return Err(self.fail(events, AgentError::RoundLimit(max)));
                }
            }

            let records = calls.into_records();
            info!(round = rounds, calls = records.len(), "Dispatching tool calls");
            let results = self.dispatcher.dispatch_all(&records, events).await;

            messages.push(Message::Assistant {
                content: (!text.is_empty()).then_some(text),
                tool_calls: records.iter().map(|r| r.to_request()).collect(),
            });
            messages.extend(results.into_iter().map(|r| r.into_message()));
        }
    }

    /// Start the conversation on a tokio task and return its event stream
    /// immediately.
    pub fn spawn(self: Arc<Self>, history: Vec<Message>) -> ConversationHandle {
        let channel = EventChannel::new();
        let events = channel.subscribe();
        let task = tokio::spawn(async move { self.run(history, &channel).await });
        ConversationHandle { events, task }
    }

    /// Run to completion without streaming and return the final text.
    pub async fn chat(&self, history: Vec<Message>) -> Result<String, AgentError> {
        let channel = EventChannel::new();
        self.run(history, &channel).await.map(|o| o.final_text)
    }
}
