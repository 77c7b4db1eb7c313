//! OpenAI chat backend
//!
//! Uses the chat completions API. OpenAI is the one built-in platform that
//! takes an explicit `response_format` flag for JSON output; the adapter sets
//! it whenever the request asks for JSON mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{
    error::BackendError, ChatBackend, ChatMessage, ChatReply, ChatRequest, Role, ToolCallRequest,
};

/// Configuration for the OpenAI adapter.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://api.openai.com)
    pub base_url: String,
    /// Default model to use (default: gpt-4-turbo)
    pub default_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            default_model: "gpt-4-turbo".to_string(),
        }
    }
}

/// Request structure for OpenAI chat completions
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<OpenAiResponseFormat>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

/// A message in OpenAI's chat format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as OpenAI sends them.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAiFunctionDef,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Response from OpenAI chat completions
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiMessage,
    pub finish_reason: Option<String>,
}

/// OpenAI adapter satisfying [`ChatBackend`].
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiBackend {
    pub fn new(
        client: reqwest::Client,
        config: OpenAiConfig,
        model: Option<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Self {
        let model = model.unwrap_or_else(|| config.default_model.clone());
        Self {
            client,
            config,
            model,
            temperature: temperature.unwrap_or(0.0),
            max_tokens,
        }
    }

    fn to_wire(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                let tool_calls = if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|c| OpenAiToolCall {
                                id: c.id.clone(),
                                call_type: "function".to_string(),
                                function: OpenAiFunctionCall {
                                    name: c.name.clone(),
                                    arguments: c.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                };
                OpenAiMessage {
                    role: role.to_string(),
                    content: Some(m.content.clone()),
                    tool_call_id: m.tool_call_id.clone(),
                    tool_calls,
                }
            })
            .collect()
    }

    /// Build the full wire request, including the JSON-mode translation:
    /// OpenAI takes an explicit `response_format` flag.
    fn to_wire_request(&self, request: &ChatRequest) -> OpenAiRequest {
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| OpenAiTool {
                        tool_type: "function".to_string(),
                        function: OpenAiFunctionDef {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let response_format = if request.json_mode {
            Some(OpenAiResponseFormat {
                format_type: "json_object".to_string(),
            })
        } else {
            None
        };

        OpenAiRequest {
            model: self.model.clone(),
            messages: Self::to_wire(&request.messages),
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            tools,
            response_format,
            stream: false,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn platform_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        let wire_request = self.to_wire_request(&request);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::OpenAi(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let openai_response: OpenAiResponse = response.json().await?;
        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("No choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let arguments = serde_json::from_str(&c.function.arguments).unwrap_or_else(|e| {
                    log::warn!(
                        "OpenAI returned unparsable tool arguments for '{}': {}",
                        c.function.name,
                        e
                    );
                    Value::Null
                });
                ToolCallRequest {
                    id: c.id,
                    name: c.function.name,
                    arguments,
                }
            })
            .collect();

        Ok(ChatReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = OpenAiRequest {
            model: "gpt-4-turbo".to_string(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: Some("Test".to_string()),
                tool_call_id: None,
                tool_calls: None,
            }],
            temperature: Some(0.0),
            max_tokens: None,
            tools: None,
            response_format: Some(OpenAiResponseFormat {
                format_type: "json_object".to_string(),
            }),
            stream: false,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("gpt-4-turbo"));
        assert!(json.contains("json_object"));
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("tool_call_id"));
    }

    #[test]
    fn test_tool_call_wire_mapping() {
        let messages = vec![ChatMessage::assistant_with_calls(
            "",
            vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "lookup".to_string(),
                arguments: json!({"q": "x"}),
            }],
        )];
        let wire = OpenAiBackend::to_wire(&messages);
        let calls = wire[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "lookup");
        assert_eq!(calls[0].function.arguments, r#"{"q":"x"}"#);
    }

    #[test]
    fn test_default_config() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.default_model, "gpt-4-turbo");
    }

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new(
            reqwest::Client::new(),
            OpenAiConfig::default(),
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let wire = backend().to_wire_request(&ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
            json_mode: true,
        });
        assert_eq!(
            wire.response_format.as_ref().map(|f| f.format_type.as_str()),
            Some("json_object")
        );
    }

    #[test]
    fn test_free_text_omits_response_format() {
        let wire = backend().to_wire_request(&ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
            json_mode: false,
        });
        assert!(wire.response_format.is_none());
        assert!(wire.tools.is_none());
    }
}
