//! Directory creation tool.

use async_trait::async_trait;
use serde_json::json;

use crate::path_guard::validate_path;
use crate::{Tool, ToolContext, ToolOutput, required_str};

pub struct MakeDirectoryTool;

#[async_trait]
impl Tool for MakeDirectoryTool {
    fn name(&self) -> &str {
        "makeDirectory"
    }

    fn description(&self) -> &str {
        "Create a directory, including any missing parent directories."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to create, relative to the project root"
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
            Err(e) => return Ok(ToolOutput::error(format!("Directory creation error: {e}"))),
        };

        if let Err(e) = tokio::fs::create_dir_all(&path).await {
            return Ok(ToolOutput::error(format!("Directory creation error: {e}")));
        }

        Ok(ToolOutput::ok(format!("Directory created at {raw_path}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_make_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let result = MakeDirectoryTool
            .execute(json!({"path": ".llms/sections"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(dir.path().join(".llms/sections").is_dir());
    }

    #[tokio::test]
    async fn test_existing_directory_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        let ctx = ToolContext::new(dir.path());
        let result = MakeDirectoryTool
            .execute(json!({"path": "docs"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_file_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docs"), "not a dir").unwrap();
        let ctx = ToolContext::new(dir.path());
        let result = MakeDirectoryTool
            .execute(json!({"path": "docs"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.content.starts_with("Directory creation error"));
    }
}
