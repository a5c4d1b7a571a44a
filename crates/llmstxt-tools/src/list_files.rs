//! Directory listing tool.

use std::path::Path;

use async_trait::async_trait;
use serde_json::json;

use crate::path_guard::validate_path;
use crate::{Tool, ToolContext, ToolOutput};

const DEFAULT_LIMIT: usize = 500;

pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "listFiles"
    }

    fn description(&self) -> &str {
        "List files in the specified directory. Directories are shown as `d name/`, files as `- name`."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list, relative to the project root. Default: \".\""
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Also list subdirectories (hidden directories are not descended into). Default: false"
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
        let raw_path = params.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let recursive = params
            .get("recursive")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let dir_path =
            match validate_path(raw_path, &context.workspace, context.restrict_to_workspace) {
                Ok(p) => p,
                Err(e) => return Ok(ToolOutput::error(format!("File listing error: {e}"))),
            };

        if !dir_path.is_dir() {
            return Ok(ToolOutput::error(format!(
                "File listing error: not a directory: {raw_path}"
            )));
        }

        let mut entries = Vec::new();
        if let Err(e) = collect(&dir_path, &dir_path, recursive, &mut entries) {
            return Ok(ToolOutput::error(format!("File listing error: {e}")));
        }

        Ok(ToolOutput::ok(format!(
            "File list for directory {raw_path}:\n```\n{}```\n",
            render(&entries)
        )))
    }
}

fn render(entries: &[String]) -> String {
    let mut out = String::new();
    for entry in entries.iter().take(DEFAULT_LIMIT) {
        out.push_str(entry);
        out.push('\n');
    }
    if entries.len() > DEFAULT_LIMIT {
        out.push_str(&format!("... (truncated at {DEFAULT_LIMIT} entries)\n"));
    }
    out
}

fn collect(
    root: &Path,
    dir: &Path,
    recursive: bool,
    entries: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut read_dir: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    read_dir.sort_by_key(|e| e.file_name());

    for entry in read_dir {
        if entries.len() > DEFAULT_LIMIT {
            return Ok(());
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if path.is_dir() {
            entries.push(format!("d {}/", relative.display()));
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if recursive && !hidden {
                collect(root, &path, recursive, entries)?;
            }
        } else {
            entries.push(format!("- {}", relative.display()));
        }
    }
    Ok(())
}
