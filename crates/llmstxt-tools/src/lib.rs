//! Tools exposed to the model during a conversation.
//!
//! Each tool implements the [`Tool`] trait and is looked up by name through
//! a [`ToolRegistry`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use llmstxt_core::types::ToolsType;

pub mod list_files;
pub mod make_directory;
pub mod path_guard;
pub mod read_file;
pub mod run_command;
pub mod write_file;

pub use list_files::ListFilesTool;
pub use make_directory::MakeDirectoryTool;
pub use read_file::ReadFileTool;
pub use run_command::RunCommandTool;
pub use write_file::WriteFileTool;

/// Context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Project root. Relative paths resolve against it.
    pub workspace: PathBuf,
    /// Reject paths that resolve outside `workspace`.
    pub restrict_to_workspace: bool,
}

impl ToolContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            restrict_to_workspace: true,
        }
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// The core tool trait. Every built-in tool implements this.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to the model (e.g., "listFiles").
    fn name(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// Execute the tool with the given parameters.
    ///
    /// Expected failures (missing file, blocked command) come back as a
    /// `ToolOutput` with `is_error` set; `Err` is for malformed parameters.
    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput>;
}

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five project tools.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListFilesTool));
        registry.register(Box::new(ReadFileTool));
        registry.register(Box::new(WriteFileTool));
        registry.register(Box::new(MakeDirectoryTool));
        registry.register(Box::new(RunCommandTool::default()));
        registry
    }

    /// Register a tool. A tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool descriptors in the shape the endpoint expects for `mode`.
    pub fn list_tools(&self, mode: ToolsType) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| {
                let function = json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                });
                match mode {
                    ToolsType::FunctionCall => function,
                    ToolsType::ToolCall => json!({ "type": "function", "function": function }),
                }
            })
            .collect()
    }

    /// Look up `name` and run it. An unregistered name yields error output,
    /// not `Err`.
    pub async fn call_tool(
        &self,
        name: &str,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            return Ok(ToolOutput::error(format!("Unknown tool: {name}")));
        };
        tool.execute(params, context).await
    }
}

/// Cut `text` to at most `max` bytes on a char boundary, noting the cut.
pub(crate) fn truncate_output(text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...\n[output truncated at {max} bytes]", &text[..end])
}

/// Required string parameter.
pub(crate) fn required_str<'a>(params: &'a serde_json::Value, key: &str) -> anyhow::Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing '{key}' parameter"))
}
