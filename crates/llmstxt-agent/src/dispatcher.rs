//! Tool dispatch: one record in, one tagged result out.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use llmstxt_core::types::Message;
use llmstxt_tools::{ToolContext, ToolRegistry};

use crate::accumulator::ToolCallRecord;
use crate::events::EventChannel;

/// The result of one tool call, tagged with the call it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    fn error(record: &ToolCallRecord, content: String) -> Self {
        Self {
            tool_call_id: record.id.clone(),
            name: record.name.clone(),
            content,
            is_error: true,
        }
    }

    pub fn into_message(self) -> Message {
        Message::Tool {
            tool_call_id: self.tool_call_id,
            name: self.name,
            content: self.content,
        }
    }
}

/// Progress line shown before a tool runs.
pub fn progress_notice(record: &ToolCallRecord) -> String {
    let preview = record.arguments.replace(['\r', '\n'], " ");
    format!("⚒️ (do task) -> {} | {}\n\n", record.name, preview)
}

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, context: Arc<ToolContext>) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one record. Never fails: every failure becomes error content.
    pub async fn dispatch(&self, record: &ToolCallRecord) -> ToolResult {
        let raw = if record.arguments.trim().is_empty() {
            "{}"
        } else {
            record.arguments.as_str()
        };

        let params: serde_json::Value = match serde_json::from_str(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(tool = %record.name, %e, "Tool arguments are not valid JSON");
                return ToolResult::error(
                    record,
                    format!("Invalid arguments for tool {}: {e}", record.name),
                );
            }
        };

        info!(tool = %record.name, call_id = %record.id, "Executing tool");
        match self
            .registry
            .call_tool(&record.name, params, &self.context)
            .await
        {
            Ok(output) => ToolResult {
                tool_call_id: record.id.clone(),
                name: record.name.clone(),
                content: output.content,
                is_error: output.is_error,
            },
            Err(e) => {
                warn!(%e, tool = %record.name, "Tool execution error");
                ToolResult::error(record, format!("Tool error: {e}"))
            }
        }
    }

    /// Run every record of one round concurrently. Results come back in the
    /// same order as `records`.
    pub async fn dispatch_all(
        &self,
        records: &[ToolCallRecord],
        events: &EventChannel,
    ) -> Vec<ToolResult> {
        for record in records {
            events.data(progress_notice(record));
        }
        join_all(records.iter().map(|record| self.dispatch(record))).await
    }
}
