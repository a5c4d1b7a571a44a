//! Prompt store: named Markdown prompts, with on-disk overrides.

use std::path::{Path, PathBuf};

use crate::error::{LlmsTxtError, Result};

/// Name of the system prompt used by `build`.
pub const GENERATE_PROMPT: &str = "generate";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[(GENERATE_PROMPT, include_str!("../prompts/generate.md"))];

/// Looks up `<name>.md` in an optional directory, falling back to the
/// prompts compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    dir: Option<PathBuf>,
}

impl PromptStore {
    /// Store backed only by the built-in prompts.
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    /// Store that prefers `<dir>/<name>.md` over the built-ins.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn file_for(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{name}.md")))
    }

    fn builtin_prompt(name: &str) -> Option<&'static str> {
        BUILTIN_PROMPTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, body)| *body)
    }

    /// Load a prompt by name.
    pub fn load_prompt(&self, name: &str) -> Result<String> {
        if let Some(path) = self.file_for(name) {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    tracing::debug!(prompt = name, path = %path.display(), "Loaded prompt override");
                    return Ok(content);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(LlmsTxtError::prompt(name, e)),
            }
        }

        Self::builtin_prompt(name)
            .map(str::to_string)
            .ok_or_else(|| LlmsTxtError::prompt(name, "no such prompt"))
    }

    pub fn prompt_exists(&self, name: &str) -> bool {
        self.file_for(name).is_some_and(|p| p.is_file()) || Self::builtin_prompt(name).is_some()
    }

    /// Sorted, de-duplicated prompt names from the directory and the built-ins.
    pub fn list_prompts(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = BUILTIN_PROMPTS.iter().map(|(n, _)| n.to_string()).collect();

        if let Some(dir) = &self.dir {
            if dir.is_dir() {
                for entry in std::fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("md") {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }
}
