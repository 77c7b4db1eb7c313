//! Anthropic chat backend
//!
//! Anthropic takes the system prompt as a top-level field rather than a
//! message, represents tool traffic as typed content blocks, and has no
//! JSON-mode flag at all -- structured output is driven entirely by the
//! prompt, so the adapter ignores `json_mode`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{
    error::BackendError, ChatBackend, ChatMessage, ChatReply, ChatRequest, Role, ToolCallRequest,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for the Anthropic adapter.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://api.anthropic.com)
    pub base_url: String,
    /// Default model to use (default: claude-3-opus-20240229)
    pub default_model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            default_model: "claude-3-opus-20240229".to_string(),
        }
    }
}

/// Request structure for the Anthropic messages API
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<AnthropicContentBlock>,
}

/// Typed content blocks in Anthropic's message format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Response from the Anthropic messages API
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContentBlock>,
    pub stop_reason: Option<String>,
}

/// Anthropic adapter satisfying [`ChatBackend`].
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(
        client: reqwest::Client,
        config: AnthropicConfig,
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
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    /// Split the unified transcript into Anthropic's top-level system string
    /// and alternating user/assistant messages. Tool results become
    /// `tool_result` blocks inside a user message.
    fn to_wire(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut wire: Vec<AnthropicMessage> = Vec::new();

        for m in messages {
            match m.role {
                Role::System => system_parts.push(&m.content),
                Role::User => wire.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: vec![AnthropicContentBlock::Text {
                        text: m.content.clone(),
                    }],
                }),
                Role::Assistant => {
                    let mut content = Vec::new();
                    if !m.content.is_empty() {
                        content.push(AnthropicContentBlock::Text {
                            text: m.content.clone(),
                        });
                    }
                    for call in &m.tool_calls {
                        content.push(AnthropicContentBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.arguments.clone(),
                        });
                    }
                    wire.push(AnthropicMessage {
                        role: "assistant".to_string(),
                        content,
                    });
                }
                Role::Tool => {
                    let block = AnthropicContentBlock::ToolResult {
                        tool_use_id: m.tool_call_id.clone().unwrap_or_default(),
                        content: m.content.clone(),
                    };
                    // Consecutive tool results collapse into one user message.
                    match wire.last_mut() {
                        Some(last) if last.role == "user"
                            && last.content.iter().all(|b| {
                                matches!(b, AnthropicContentBlock::ToolResult { .. })
                            }) =>
                        {
                            last.content.push(block);
                        }
                        _ => wire.push(AnthropicMessage {
                            role: "user".to_string(),
                            content: vec![block],
                        }),
                    }
                }
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, wire)
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn platform_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        let (system, messages) = Self::to_wire(&request.messages);

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| AnthropicTool {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        input_schema: t.parameters.clone(),
                    })
                    .collect(),
            )
        };

        let wire_request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system,
            messages,
            temperature: Some(self.temperature),
            tools,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Anthropic(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let anthropic_response: AnthropicResponse = response.json().await?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in anthropic_response.content {
            match block {
                AnthropicContentBlock::Text { text } => {
                    if !content.is_empty() {
                        content.push('\n');
                    }
                    content.push_str(&text);
                }
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    });
                }
                AnthropicContentBlock::ToolResult { .. } => {
                    return Err(BackendError::InvalidResponse(
                        "Unexpected tool_result block in model reply".to_string(),
                    ));
                }
            }
        }

        Ok(ChatReply {
            content,
            tool_calls,
            finish_reason: anthropic_response.stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_message_is_lifted() {
        let messages = vec![
            ChatMessage::system("Be helpful"),
            ChatMessage::user("Hello"),
        ];
        let (system, wire) = AnthropicBackend::to_wire(&messages);
        assert_eq!(system.as_deref(), Some("Be helpful"));
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
    }

    #[test]
    fn test_tool_results_become_user_blocks() {
        let messages = vec![
            ChatMessage::user("go"),
            ChatMessage::assistant_with_calls(
                "",
                vec![ToolCallRequest {
                    id: "t1".to_string(),
                    name: "lookup".to_string(),
                    arguments: json!({"q": 1}),
                }],
            ),
            ChatMessage::tool("lookup", "t1", "found it"),
        ];
        let (_, wire) = AnthropicBackend::to_wire(&messages);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[2].role, "user");
        match &wire[2].content[0] {
            AnthropicContentBlock::ToolResult { tool_use_id, content } => {
                assert_eq!(tool_use_id, "t1");
                assert_eq!(content, "found it");
            }
            other => panic!("expected tool_result, got {:?}", other),
        }
    }

    #[test]
    fn test_content_block_serialization() {
        let block = AnthropicContentBlock::ToolUse {
            id: "t1".to_string(),
            name: "lookup".to_string(),
            input: json!({}),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains(r#""type":"tool_use""#));
    }
}
