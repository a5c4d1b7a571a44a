//! `init`: interactive wizard that writes `llms-txt-generator.yaml`.

use std::path::Path;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use tracing::info;

use llmstxt_core::config::{AzureConfig, Config, DEFAULT_AZURE_API_VERSION, DEFAULT_MAX_TOKENS};
use llmstxt_core::types::ToolsType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Azure,
}

/// Everything the wizard asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct InitAnswers {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Azure only.
    pub deployment: Option<String>,
    /// Azure only.
    pub api_version: Option<String>,
    pub max_tokens: u32,
    pub tools_type: ToolsType,
    pub output_dir: String,
}

impl InitAnswers {
    pub fn into_config(self) -> Config {
        let azure_openai = match self.provider {
            Provider::OpenAi => None,
            Provider::Azure => Some(AzureConfig {
                deployment: self.deployment,
                api_version: self.api_version,
            }),
        };

        Config {
            model: Some(self.model),
            api_key: Some(self.api_key),
            base_url: Some(self.base_url),
            max_tokens: Some(self.max_tokens),
            tools_type: Some(self.tools_type),
            output_dir: Some(self.output_dir),
            azure_openai,
            ..Config::default()
        }
    }

    /// Human-readable summary with the API key masked.
    pub fn summary(&self) -> String {
        let provider = match self.provider {
            Provider::OpenAi => "OpenAI",
            Provider::Azure => "Azure OpenAI",
        };
        let mut lines = vec![
            format!("Provider:    {provider}"),
            format!("Model:       {}", self.model),
            format!("API key:     {}", mask_key(&self.api_key)),
            format!("Base URL:    {}", self.base_url),
        ];
        if let Some(deployment) = &self.deployment {
            lines.push(format!("Deployment:  {deployment}"));
        }
        if let Some(version) = &self.api_version {
            lines.push(format!("API version: {version}"));
        }
        lines.push(format!("Max tokens:  {}", self.max_tokens));
        lines.push(format!("Tools type:  {}", self.tools_type));
        lines.push(format!("Output dir:  {}", self.output_dir));
        lines.join("\n")
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn text(theme: &ColorfulTheme, prompt: &str, default: &str) -> anyhow::Result<String> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn ask(theme: &ColorfulTheme) -> anyhow::Result<InitAnswers> {
    let provider = match Select::with_theme(theme)
        .with_prompt("LLM provider")
        .items(&["OpenAI", "Azure OpenAI"])
        .default(0)
        .interact()?
    {
        0 => Provider::OpenAi,
        _ => Provider::Azure,
    };

    let (api_key, base_url, model, deployment, api_version) = match provider {
        Provider::OpenAi => (
            text(theme, "OpenAI API key", "your-api-key-here")?,
            text(theme, "Base URL", "https://api.openai.com/v1")?,
            text(theme, "Model", "gpt-4o")?,
            None,
            None,
        ),
        Provider::Azure => (
            text(theme, "Azure OpenAI API key", "your-azure-api-key-here")?,
            text(theme, "Azure OpenAI endpoint", "https://your-resource.openai.azure.com")?,
            text(theme, "Model", "gpt-4")?,
            Some(text(theme, "Deployment name", "gpt-4")?),
            Some(text(theme, "API version", DEFAULT_AZURE_API_VERSION)?),
        ),
    };

    let max_tokens: u32 = Input::with_theme(theme)
        .with_prompt("Max tokens")
        .default(DEFAULT_MAX_TOKENS)
        .validate_with(|n: &u32| {
            if *n > 0 {
                Ok(())
            } else {
                Err("must be a positive integer")
            }
        })
        .interact_text()?;

    let tools_type = match Select::with_theme(theme)
        .with_prompt("Tools type")
        .items(&[ToolsType::FunctionCall.as_str(), ToolsType::ToolCall.as_str()])
        .default(0)
        .interact()?
    {
        0 => ToolsType::FunctionCall,
        _ => ToolsType::ToolCall,
    };

    let output_dir = text(theme, "Output directory", "./")?;

    Ok(InitAnswers {
        provider,
        api_key,
        base_url,
        model,
        deployment,
        api_version,
        max_tokens,
        tools_type,
        output_dir,
    })
}

/// Run the wizard and write the config to `path`. Returns whether a file
/// was written.
pub fn run(path: &Path, force: bool) -> anyhow::Result<bool> {
    let theme = ColorfulTheme::default();
    println!("Configuring llms-txt-generator\n");

    let answers = ask(&theme)?;
    println!("\n{}\n", answers.summary());

    if !Confirm::with_theme(&theme)
        .with_prompt("Save this configuration?")
        .default(true)
        .interact()?
    {
        info!("Configuration not saved");
        return Ok(false);
    }

    if path.exists()
        && !force
        && !Confirm::with_theme(&theme)
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()?
    {
        info!("Keeping existing configuration");
        return Ok(false);
    }

    answers.into_config().save(path)?;
    info!(path = %path.display(), "Configuration saved");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_answers() -> InitAnswers {
        InitAnswers {
            provider: Provider::OpenAi,
            api_key: "sk-test-1234567890".into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            deployment: None,
            api_version: None,
            max_tokens: 16384,
            tools_type: ToolsType::FunctionCall,
            output_dir: "./".into(),
        }
    }

    #[test]
    fn test_openai_answers_to_config() {
        let config = openai_answers().into_config();
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.api_key.as_deref(), Some("sk-test-1234567890"));
        assert_eq!(config.max_tokens, Some(16384));
        assert_eq!(config.tools_type, Some(ToolsType::FunctionCall));
        assert_eq!(config.output_dir.as_deref(), Some("./"));
        assert!(config.azure_openai.is_none());
    }

    #[test]
    fn test_azure_answers_to_config() {
        let answers = InitAnswers {
            provider: Provider::Azure,
            base_url: "https://example.openai.azure.com".into(),
            deployment: Some("gpt-4-prod".into()),
            api_version: Some("2024-06-01".into()),
            tools_type: ToolsType::ToolCall,
            ..openai_answers()
        };
        let config = answers.into_config();
        let azure = config.azure_openai.as_ref().unwrap();
        assert_eq!(azure.deployment.as_deref(), Some("gpt-4-prod"));
        assert_eq!(azure.api_version.as_deref(), Some("2024-06-01"));
        assert_eq!(config.tools_type, Some(ToolsType::ToolCall));
    }

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("llms-txt-generator.yaml");
        openai_answers().into_config().save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("# Model Configuration"));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.model.as_deref(), Some("gpt-4o"));
        assert_eq!(loaded.tools_type(), ToolsType::FunctionCall);
        assert_eq!(loaded.max_tokens(), 16384);
    }

    #[test]
    fn test_summary_masks_key() {
        let summary = openai_answers().summary();
        assert!(summary.contains("sk-t...7890"));
        assert!(!summary.contains("sk-test-1234567890"));
        assert!(summary.contains("Tools type:  function_call"));
        assert!(!summary.contains("Deployment"));
    }

    #[test]
    fn test_mask_short_key() {
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key(""), "");
    }
}
