use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmsTxtError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to load prompt '{name}': {message}")]
    Prompt { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LlmsTxtError {
    pub fn prompt(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Prompt {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmsTxtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_error_message() {
        let err = LlmsTxtError::prompt("nonexistent", "no such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to load prompt 'nonexistent': no such file or directory"
        );
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [unclosed").unwrap_err();
        let err: LlmsTxtError = yaml_err.into();
        assert!(err.to_string().starts_with("YAML error"));
    }
}
