//! File writing tool with atomic writes.

use async_trait::async_trait;
use serde_json::json;

use crate::path_guard::validate_write_path;
use crate::{Tool, ToolContext, ToolOutput, required_str};

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "writeFile"
    }

    fn description(&self) -> &str {
        "Write content to a specified file, creating parent directories as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the project root"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let raw_path = required_str(&params, "path")?;
        let content = required_str(&params, "content")?;

        let path = match validate_write_path(
            raw_path,
            &context.workspace,
            context.restrict_to_workspace,
            true,
        ) {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutput::error(format!("File writing error: {e}"))),
        };

        // Unique temp file next to the target, then rename over it.
        let mut tmp_name = std::ffi::OsString::from(".");
        tmp_name.push(path.file_name().unwrap_or_default());
        tmp_name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let tmp_path = path.with_file_name(tmp_name);

        if let Err(e) = tokio::fs::write(&tmp_path, content.as_bytes()).await {
            return Ok(ToolOutput::error(format!("File writing error: {e}")));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Ok(ToolOutput::error(format!("File writing error: {e}")));
        }

        tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(ToolOutput::ok(format!("Content written to {raw_path}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());

        let result = WriteFileTool
            .execute(json!({"path": "out.txt", "content": "hello world"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, "Content written to out.txt");

        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "hello world");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writes_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let a = "a".repeat(200_000);
        let b = "b".repeat(200_000);

        for _ in 0..20 {
            let (first, second) = tokio::join!(
                WriteFileTool.execute(json!({"path": "llms.txt", "content": a}), &ctx),
                WriteFileTool.execute(json!({"path": "llms.txt", "content": b}), &ctx),
            );
            assert!(!first.unwrap().is_error);
            assert!(!second.unwrap().is_error);

            let written = std::fs::read_to_string(dir.path().join("llms.txt")).unwrap();
            assert!(written == a || written == b);
        }
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());

        let result = WriteFileTool
            .execute(
                json!({"path": ".llms/llms-full.txt", "content": "# Full"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(!result.is_error);

        let written = std::fs::read_to_string(dir.path().join(".llms/llms-full.txt")).unwrap();
        assert_eq!(written, "# Full");
    }

    #[tokio::test]
    async fn test_write_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("llms.txt"), "old").unwrap();
        let ctx = ToolContext::new(dir.path());

        WriteFileTool
            .execute(json!({"path": "llms.txt", "content": "new"}), &ctx)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("llms.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_write_outside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let result = WriteFileTool
            .execute(json!({"path": "../escape.txt", "content": "x"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("outside the workspace"));
    }
}
