use serde::{Deserialize, Serialize};

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Raw JSON text exactly as the model produced it.
    pub arguments: String,
}

/// One turn of a conversation.
///
/// The history is append-only; a message is never edited after it has been
/// pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        /// Name of the tool that produced the result. Needed by the legacy
        /// `function` role encoding.
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }
}

/// Shape used to describe tools to the model endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolsType {
    /// Legacy `functions` / `function_call` protocol.
    FunctionCall,
    /// `tools` / `tool_calls` protocol.
    #[default]
    ToolCall,
}

impl ToolsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FunctionCall => "function_call",
            Self::ToolCall => "tool_call",
        }
    }
}

impl std::fmt::Display for ToolsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stop sequences: providers accept either a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequence {
    One(String),
    Many(Vec<String>),
}

/// Sampling options forwarded to the model endpoint.
///
/// Every field is optional; an unset field is left out of the request body
/// entirely so the provider default applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_options_are_omitted() {
        let options = RequestOptions {
            max_tokens: Some(1024),
            ..Default::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["max_tokens"], 1024);
        assert!(obj.get("temperature").is_none());
        assert!(obj.get("seed").is_none());
    }

    #[test]
    fn test_zero_values_are_still_sent() {
        let options = RequestOptions {
            temperature: Some(0.0),
            seed: Some(0),
            ..Default::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["temperature"], 0.0);
        assert_eq!(value["seed"], 0);
    }

    #[test]
    fn test_stop_sequence_shapes() {
        let one: StopSequence = serde_json::from_str(r#""END""#).unwrap();
        assert_eq!(one, StopSequence::One("END".into()));
        let many: StopSequence = serde_json::from_str(r#"["\n\n","END"]"#).unwrap();
        assert_eq!(
            many,
            StopSequence::Many(vec!["\n\n".into(), "END".into()])
        );
    }

    #[test]
    fn test_message_roles() {
        assert_eq!(Message::system("x").role(), Role::System);
        assert_eq!(Message::user("x").role(), Role::User);
        let assistant = Message::Assistant {
            content: None,
            tool_calls: vec![],
        };
        assert_eq!(assistant.role(), Role::Assistant);
    }

    #[test]
    fn test_tools_type_serde() {
        let t: ToolsType = serde_yaml::from_str("function_call").unwrap();
        assert_eq!(t, ToolsType::FunctionCall);
        assert_eq!(ToolsType::ToolCall.to_string(), "tool_call");
    }
}
