//! Configuration loading, environment fallbacks, and validation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{RequestOptions, StopSequence, ToolsType};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "llms-txt-generator.yaml";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 16 * 1024;
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Top-level configuration, as stored in `llms-txt-generator.yaml`.
///
/// Keys are camelCase (`baseURL`, `azureOpenAI` spelled as shown).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key, checked after `apiKey`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_type: Option<ToolsType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Upper bound on tool rounds per conversation. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,

    /// Directory searched for `<name>.md` prompt overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<String>,

    #[serde(rename = "azureOpenAI", skip_serializing_if = "Option::is_none")]
    pub azure_openai: Option<AzureConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "llmstxt_agent=debug").
    #[serde(default)]
    pub filters: Vec<String>,
}

fn default_log_format() -> String {
    "plain".into()
}

/// Azure OpenAI deployment settings after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSettings {
    pub deployment: String,
    pub api_version: String,
}

/// Settings with every fallback (file, environment, default) applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub tools_type: ToolsType,
    pub azure: Option<AzureSettings>,
    pub output_dir: Option<PathBuf>,
    pub prompts_dir: Option<PathBuf>,
    pub max_rounds: Option<u32>,
    pub options: RequestOptions,
}

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env reference pattern"));

/// Replace `${NAME}` with the value of `NAME`, or nothing when unset.
fn substitute_env_vars(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Load `.env.local` then `.env` from the working directory.
///
/// Variables already present in the process environment are never
/// overwritten, so `.env.local` takes precedence over `.env`.
pub fn load_env_files() {
    for file in [".env.local", ".env"] {
        match dotenv::from_filename(file) {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(file, %e, "Failed to load environment file"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from a YAML file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file yields the default config.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    /// Parse config from YAML text, substituting `${ENV_VAR}` references.
    pub fn from_yaml(raw: &str) -> crate::error::Result<Self> {
        let substituted = substitute_env_vars(raw);
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&substituted)
            .map_err(|e| crate::error::LlmsTxtError::Config(e.to_string()))
    }

    /// Default config file location: `./llms-txt-generator.yaml`.
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Tools type, defaulting to the legacy function-call shape.
    pub fn tools_type(&self) -> ToolsType {
        self.tools_type.unwrap_or(ToolsType::FunctionCall)
    }

    /// Max tokens per completion.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Sampling options to forward with every request.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            max_tokens: Some(self.max_tokens()),
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            stop: self.stop.clone(),
            seed: self.seed,
        }
    }

    /// Apply environment fallbacks from the process environment.
    pub fn resolve(&self) -> ResolvedConfig {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Apply fallbacks using the given environment lookup.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> ResolvedConfig {
        let azure = match &self.azure_openai {
            Some(azure) => Some(AzureSettings {
                deployment: non_empty(azure.deployment.clone())
                    .or_else(|| non_empty(env("AZURE_OPENAI_API_DEVELOPMENT")))
                    .unwrap_or_else(|| self.model.clone().unwrap_or_default()),
                api_version: non_empty(azure.api_version.clone())
                    .or_else(|| non_empty(env("AZURE_OPENAI_API_VERSION")))
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            }),
            None => non_empty(env("AZURE_OPENAI_API_DEVELOPMENT")).map(|deployment| {
                AzureSettings {
                    deployment,
                    api_version: non_empty(env("AZURE_OPENAI_API_VERSION"))
                        .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                }
            }),
        };

        let api_key = non_empty(self.api_key.clone())
            .or_else(|| self.api_key_env.as_deref().and_then(|name| non_empty(env(name))))
            .or_else(|| {
                if azure.is_some() {
                    non_empty(env("AZURE_OPENAI_API_KEY"))
                        .or_else(|| non_empty(env("OPENAI_API_KEY")))
                } else {
                    non_empty(env("OPENAI_API_KEY"))
                }
            });

        let base_url = non_empty(self.base_url.clone())
            .or_else(|| {
                if azure.is_some() {
                    non_empty(env("AZURE_OPENAI_API_ENDPOINT"))
                } else {
                    None
                }
            })
            .or_else(|| non_empty(env("OPENAI_API_BASE")))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        ResolvedConfig {
            model: non_empty(self.model.clone())
                .or_else(|| non_empty(env("OPENAI_API_MODEL")))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            base_url,
            tools_type: self.tools_type(),
            azure,
            output_dir: non_empty(self.output_dir.clone()).map(PathBuf::from),
            prompts_dir: non_empty(self.prompts_dir.clone()).map(PathBuf::from),
            max_rounds: self.max_rounds,
            options: self.request_options(),
        }
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        self.validate_resolved(&self.resolve())
    }

    /// Validate against already-resolved settings.
    pub fn validate_resolved(&self, resolved: &ResolvedConfig) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if resolved.api_key.is_none() {
            errors.push(
                "API key is required. Set OPENAI_API_KEY or provide apiKey in the config file."
                    .to_string(),
            );
        }

        if !resolved.base_url.starts_with("http://") && !resolved.base_url.starts_with("https://")
        {
            errors.push(format!(
                "baseURL must be an http(s) URL, got '{}'",
                resolved.base_url
            ));
        }

        if self.max_tokens == Some(0) {
            errors.push("maxTokens cannot be 0".to_string());
        }

        if self.max_rounds == Some(0) {
            errors.push("maxRounds cannot be 0".to_string());
        }

        if let Some(azure) = &resolved.azure {
            if azure.deployment.is_empty() {
                warnings.push("Azure OpenAI is configured without a deployment name".to_string());
            }
        }

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                warnings.push(format!("temperature {t} is outside the usual 0.0-2.0 range"));
            }
        }

        (warnings, errors)
    }

    /// Render the config as commented YAML, grouped by section.
    pub fn to_commented_yaml(&self) -> crate::error::Result<String> {
        let mut out = String::from(
            "# This file contains configuration for the LLM model and generation parameters\n",
        );

        let model_section = [
            yaml_line("model", &self.model)?,
            yaml_line("apiKey", &self.api_key)?,
            yaml_line("apiKeyEnv", &self.api_key_env)?,
            yaml_line("baseURL", &self.base_url)?,
        ];
        push_section(&mut out, "Model Configuration", &model_section);

        let generation_section = [
            yaml_line("maxTokens", &self.max_tokens)?,
            yaml_line("temperature", &self.temperature)?,
            yaml_line("topP", &self.top_p)?,
            yaml_line("frequencyPenalty", &self.frequency_penalty)?,
            yaml_line("presencePenalty", &self.presence_penalty)?,
            yaml_line("stop", &self.stop)?,
            yaml_line("seed", &self.seed)?,
            yaml_line("toolsType", &self.tools_type)?,
            yaml_line("maxRounds", &self.max_rounds)?,
        ];
        push_section(&mut out, "Generation Parameters", &generation_section);

        let output_section = [
            yaml_line("outputDir", &self.output_dir)?,
            yaml_line("promptsDir", &self.prompts_dir)?,
        ];
        push_section(&mut out, "Output Configuration", &output_section);

        if self.azure_openai.is_some() {
            push_section(
                &mut out,
                "Azure OpenAI Configuration",
                &[yaml_line("azureOpenAI", &self.azure_openai)?],
            );
        }

        if self.logging.is_some() {
            push_section(&mut out, "Logging", &[yaml_line("logging", &self.logging)?]);
        }

        Ok(out)
    }

    /// Save config to a file as commented YAML.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let yaml = self.to_commented_yaml()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

/// Serialize `key: value` for a present value; nested values are indented
/// under the key.
fn yaml_line<T: Serialize>(key: &str, value: &Option<T>) -> crate::error::Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let rendered = serde_yaml::to_string(value)?;
    let rendered = rendered.trim_end();
    let is_block = serde_yaml::to_value(value)
        .map(|v| v.is_mapping() || v.is_sequence())
        .unwrap_or(false);

    if is_block {
        let indented: Vec<String> = rendered.lines().map(|l| format!("  {l}")).collect();
        Ok(Some(format!("{key}:\n{}", indented.join("\n"))))
    } else {
        Ok(Some(format!("{key}: {rendered}")))
    }
}

fn push_section(out: &mut String, title: &str, lines: &[Option<String>]) {
    let present: Vec<&String> = lines.iter().flatten().collect();
    if present.is_empty() {
        return;
    }
    out.push_str(&format!("\n# {title}\n"));
    for line in present {
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only env var with a unique name.
        unsafe { std::env::set_var("LLMSTXT_TEST_SUBST_KEY", "sk-from-env") };
        let config = Config::from_yaml("apiKey: ${LLMSTXT_TEST_SUBST_KEY}\n").unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-from-env"));
    }

    #[test]
    fn test_env_var_missing() {
        let result = substitute_env_vars("key: ${LLMSTXT_TEST_DEFINITELY_MISSING}");
        assert_eq!(result, "key: ");
    }

    #[test]
    fn test_parse_sectioned_layout() {
        let yaml = r#"
# Model Configuration
model: gpt-4o
apiKey: sk-test
baseURL: https://example.com/v1

# Generation Parameters
maxTokens: 8192
toolsType: tool_call

# Output Configuration
outputDir: ./docs

azureOpenAI:
  deployment: gpt-4
  apiVersion: 2024-06-01
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.base_url.as_deref(), Some("https://example.com/v1"));
        assert_eq!(config.max_tokens(), 8192);
        assert_eq!(config.tools_type(), ToolsType::ToolCall);
        assert_eq!(config.output_dir.as_deref(), Some("./docs"));
        let azure = config.azure_openai.unwrap();
        assert_eq!(azure.deployment.as_deref(), Some("gpt-4"));
        assert_eq!(azure.api_version.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_yaml("# only comments\n").unwrap();
        assert!(config.model.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.yaml")).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_defaults_without_env() {
        let resolved = Config::default().resolve_with(no_env);
        assert_eq!(resolved.model, DEFAULT_MODEL);
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.tools_type, ToolsType::FunctionCall);
        assert_eq!(resolved.options.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert!(resolved.api_key.is_none());
        assert!(resolved.azure.is_none());
        assert!(resolved.max_rounds.is_none());
    }

    #[test]
    fn test_env_fallbacks() {
        let env = |key: &str| match key {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "OPENAI_API_MODEL" => Some("gpt-4o-mini".to_string()),
            "OPENAI_API_BASE" => Some("http://localhost:8080/v1".to_string()),
            _ => None,
        };
        let resolved = Config::default().resolve_with(env);
        assert_eq!(resolved.api_key.as_deref(), Some("sk-env"));
        assert_eq!(resolved.model, "gpt-4o-mini");
        assert_eq!(resolved.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_file_values_win_over_env() {
        let config = Config {
            model: Some("from-file".into()),
            api_key: Some("sk-file".into()),
            ..Default::default()
        };
        let env = |key: &str| match key {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "OPENAI_API_MODEL" => Some("from-env".to_string()),
            _ => None,
        };
        let resolved = config.resolve_with(env);
        assert_eq!(resolved.model, "from-file");
        assert_eq!(resolved.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn test_azure_from_env() {
        let env = |key: &str| match key {
            "AZURE_OPENAI_API_DEVELOPMENT" => Some("my-deploy".to_string()),
            "AZURE_OPENAI_API_KEY" => Some("azure-key".to_string()),
            "AZURE_OPENAI_API_ENDPOINT" => Some("https://res.openai.azure.com".to_string()),
            _ => None,
        };
        let resolved = Config::default().resolve_with(env);
        let azure = resolved.azure.unwrap();
        assert_eq!(azure.deployment, "my-deploy");
        assert_eq!(azure.api_version, DEFAULT_AZURE_API_VERSION);
        assert_eq!(resolved.api_key.as_deref(), Some("azure-key"));
        assert_eq!(resolved.base_url, "https://res.openai.azure.com");
    }

    #[test]
    fn test_request_options_only_present_fields() {
        let config = Config {
            temperature: Some(0.7),
            seed: Some(42),
            ..Default::default()
        };
        let options = config.request_options();
        assert_eq!(options.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.seed, Some(42));
        assert!(options.top_p.is_none());
        assert!(options.stop.is_none());
    }

    #[test]
    fn test_validate_missing_api_key_errors() {
        let config = Config::default();
        let resolved = config.resolve_with(no_env);
        let (_, errors) = config.validate_resolved(&resolved);
        assert!(errors.iter().any(|e| e.contains("API key is required")));
    }

    #[test]
    fn test_validate_bad_values() {
        let config = Config {
            api_key: Some("sk".into()),
            base_url: Some("ftp://nope".into()),
            max_rounds: Some(0),
            temperature: Some(3.5),
            ..Default::default()
        };
        let resolved = config.resolve_with(no_env);
        let (warnings, errors) = config.validate_resolved(&resolved);
        assert!(errors.iter().any(|e| e.contains("baseURL")));
        assert!(errors.iter().any(|e| e.contains("maxRounds")));
        assert!(warnings.iter().any(|w| w.contains("temperature")));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = Config {
            model: Some("gpt-4".into()),
            api_key: Some("your-azure-api-key-here".into()),
            base_url: Some("https://your-resource.openai.azure.com".into()),
            max_tokens: Some(16384),
            tools_type: Some(ToolsType::FunctionCall),
            output_dir: Some("./".into()),
            azure_openai: Some(AzureConfig {
                deployment: Some("gpt-4".into()),
                api_version: Some("2024-02-15-preview".into()),
            }),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("# Model Configuration"));
        assert!(raw.contains("# Azure OpenAI Configuration"));
        assert!(!raw.contains("temperature"));

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.model, config.model);
        assert_eq!(reloaded.base_url, config.base_url);
        assert_eq!(reloaded.output_dir.as_deref(), Some("./"));
        assert_eq!(reloaded.azure_openai, config.azure_openai);
    }
}
