//! Shell command tool with a dangerous-pattern blocklist.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::{Tool, ToolContext, ToolOutput, required_str, truncate_output};

/// Substrings (matched case-insensitively) that block a command outright.
const DANGEROUS_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "rm -rf $home",
    "mkfs",
    "dd if=",
    "shutdown",
    "reboot",
    "poweroff",
    ":(){ :|:& };:",
    "> /dev/sd",
    "/dev/nvme",
    "chmod -r 777 /",
    "sudo ",
    "su -",
    "eval ",
    "iptables ",
    "nc -l",
    "ncat -l",
    "nohup ",
    "crontab ",
    "systemctl ",
];

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_OUTPUT: usize = 100_000;

pub struct RunCommandTool {
    pub default_timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl Default for RunCommandTool {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT,
        }
    }
}

impl RunCommandTool {
    fn is_dangerous(command: &str) -> bool {
        let lower = command.to_lowercase();
        if DANGEROUS_PATTERNS.iter().any(|pat| lower.contains(pat)) {
            return true;
        }
        // curl/wget ... | sh/bash
        let parts: Vec<&str> = lower.split('|').map(str::trim).collect();
        parts.windows(2).any(|pair| {
            (pair[0].starts_with("curl") || pair[0].starts_with("wget"))
                && (pair[1].starts_with("sh") || pair[1].starts_with("bash"))
        })
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "runCommand"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the project root and return its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": "Timeout in milliseconds (default: 30000)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let command = required_str(&params, "command")?;
        let timeout_ms = params
            .get("timeout_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.default_timeout_ms);

        if Self::is_dangerous(command) {
            warn!(command, "Blocked dangerous command");
            return Ok(ToolOutput::error(format!(
                "Command blocked: '{command}' matches a dangerous pattern"
            )));
        }

        debug!(command, timeout_ms, "Running command");

        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&context.workspace)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(ToolOutput::error(format!("Command execution error: {e}")));
            }
            Err(_) => {
                return Ok(ToolOutput::error(format!(
                    "Command timed out after {timeout_ms}ms"
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            let mut content = format!("Command executed successfully. Output:\n\n```\n{stdout}```\n");
            if !stderr.is_empty() {
                content.push_str(&format!("\nstderr:\n{stderr}"));
            }
            return Ok(ToolOutput::ok(truncate_output(content, self.max_output_bytes)));
        }

        let exit_code = output.status.code().unwrap_or(-1);
        let content = format!(
            "Command execution error: exit code {exit_code}\nstdout:\n{stdout}\nstderr:\n{stderr}"
        );
        Ok(ToolOutput::error(truncate_output(content, self.max_output_bytes)))
    }
}
