//! File reading tool.

use async_trait::async_trait;
use serde_json::json;

use crate::path_guard::validate_path;
use crate::{Tool, ToolContext, ToolOutput, required_str, truncate_output};

const MAX_READ_BYTES: usize = 256 * 1024;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "readFile"
    }

    fn description(&self) -> &str {
        "Read the content of a specified file as text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the project root"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let raw_path = required_str(&params, "path")?;

        let path = match validate_path(raw_path, &context.workspace, context.restrict_to_workspace)
        {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutput::error(format!("File reading error: {e}"))),
        };

        if !path.is_file() {
            return Ok(ToolOutput::error(format!(
                "File reading error: file not found: {raw_path}"
            )));
        }

        let content = match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return Ok(ToolOutput::error(format!("File reading error: {e}"))),
        };

        let content = truncate_output(content, MAX_READ_BYTES);
        let fence_end = if content.ends_with('\n') { "" } else { "\n" };
        Ok(ToolOutput::ok(format!(
            "File content for {raw_path}:\n```\n{content}{fence_end}```\n"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "line1\nline2\n").unwrap();

        let ctx = ToolContext::new(dir.path());
        let result = ReadFileTool
            .execute(json!({"path": "hello.txt"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.content,
            "File content for hello.txt:\n```\nline1\nline2\n```\n"
        );
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let result = ReadFileTool
            .execute(json!({"path": "nope.txt"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("not found"));
    }

    #[tokio::test]
    async fn test_missing_path_param_is_err() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let err = ReadFileTool.execute(json!({}), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("missing 'path'"));
    }

    #[tokio::test]
    async fn test_large_file_truncated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(MAX_READ_BYTES + 10)).unwrap();

        let ctx = ToolContext::new(dir.path());
        let result = ReadFileTool
            .execute(json!({"path": "big.txt"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("[output truncated"));
    }
}
