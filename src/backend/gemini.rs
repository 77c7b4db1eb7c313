//! Google Gemini chat backend
//!
//! Gemini has its own quirks: the system prompt travels as `systemInstruction`,
//! tool calls come back as `functionCall` parts without ids (the adapter
//! synthesizes uuids so the loop can correlate results), and JSON output
//! requires an explicit `responseMimeType` -- which the API rejects when
//! function declarations are present, so it is only set for tool-free calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{
    error::BackendError, ChatBackend, ChatMessage, ChatReply, ChatRequest, Role, ToolCallRequest,
};

/// Configuration for the Gemini adapter.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://generativelanguage.googleapis.com)
    pub base_url: String,
    /// Default model to use (default: gemini-1.5-pro-latest)
    pub default_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            default_model: "gemini-1.5-pro-latest".to_string(),
        }
    }
}

/// Request structure for Gemini generate content
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiToolDeclarations>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

/// A part of content: text, a model-requested function call, or a
/// function response fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiToolDeclarations {
    pub function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiFunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Response from Gemini generate content
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: GeminiContent,
    pub finish_reason: Option<String>,
}

/// Gemini adapter satisfying [`ChatBackend`].
pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl GeminiBackend {
    pub fn new(
        client: reqwest::Client,
        config: GeminiConfig,
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

    /// Split the transcript into `systemInstruction` and `contents`.
    fn to_wire(messages: &[ChatMessage]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_parts: Vec<GeminiPart> = Vec::new();
        let mut contents: Vec<GeminiContent> = Vec::new();

        for m in messages {
            match m.role {
                Role::System => system_parts.push(GeminiPart::text(&m.content)),
                Role::User => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart::text(&m.content)],
                }),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !m.content.is_empty() {
                        parts.push(GeminiPart::text(&m.content));
                    }
                    for call in &m.tool_calls {
                        parts.push(GeminiPart {
                            text: None,
                            function_call: Some(GeminiFunctionCall {
                                name: call.name.clone(),
                                args: call.arguments.clone(),
                            }),
                            function_response: None,
                        });
                    }
                    contents.push(GeminiContent {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
                Role::Tool => contents.push(GeminiContent {
                    role: Some("function".to_string()),
                    parts: vec![GeminiPart {
                        text: None,
                        function_call: None,
                        function_response: Some(GeminiFunctionResponse {
                            name: m.name.clone().unwrap_or_default(),
                            response: serde_json::json!({ "content": m.content }),
                        }),
                    }],
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };
        (system, contents)
    }

    /// Build the full wire request, including the JSON-mode translation:
    /// Gemini wants an explicit `responseMimeType`, but the API rejects it
    /// together with function declarations, so it is only set for tool-free
    /// calls.
    fn to_wire_request(&self, request: &ChatRequest) -> GeminiRequest {
        let (system_instruction, contents) = Self::to_wire(&request.messages);

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiToolDeclarations {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        let response_mime_type = if request.json_mode && tools.is_none() {
            Some("application/json".to_string())
        } else {
            None
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(self.temperature),
                max_output_tokens: self.max_tokens,
                response_mime_type,
            }),
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn platform_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        let wire_request = self.to_wire_request(&request);

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Gemini(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("No candidates in response".to_string()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(text) = part.text {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                // Gemini does not assign call ids; synthesize one.
                tool_calls.push(ToolCallRequest {
                    id: format!("gemini_{}", uuid::Uuid::new_v4().simple()),
                    name: call.name,
                    arguments: call.args,
                });
            }
        }

        Ok(ChatReply {
            content,
            tool_calls,
            finish_reason: candidate.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_instruction_has_no_role() {
        let messages = vec![ChatMessage::system("Be concise"), ChatMessage::user("Hi")];
        let (system, contents) = GeminiBackend::to_wire(&messages);
        assert!(system.unwrap().role.is_none());
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
    }

    #[test]
    fn test_tool_result_becomes_function_response() {
        let messages = vec![ChatMessage::tool("lookup", "gemini_1", "result text")];
        let (_, contents) = GeminiBackend::to_wire(&messages);
        let part = &contents[0].parts[0];
        let response = part.function_response.as_ref().unwrap();
        assert_eq!(response.name, "lookup");
        assert_eq!(response.response["content"], "result text");
    }

    #[test]
    fn test_request_serialization_is_camel_case() {
        let request = GeminiRequest {
            contents: vec![],
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text("sys")],
            }),
            tools: None,
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: None,
                response_mime_type: Some("application/json".to_string()),
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("systemInstruction"));
        assert!(json.contains("responseMimeType"));
    }

    fn backend() -> GeminiBackend {
        GeminiBackend::new(
            reqwest::Client::new(),
            GeminiConfig::default(),
            None,
            None,
            None,
        )
    }

    fn lookup_schema() -> crate::backend::ToolSchema {
        crate::backend::ToolSchema {
            name: "lookup".to_string(),
            description: "Looks things up.".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    fn mime_type_of(wire: &GeminiRequest) -> Option<&str> {
        wire.generation_config
            .as_ref()
            .and_then(|c| c.response_mime_type.as_deref())
    }

    #[test]
    fn test_json_mode_without_tools_sets_mime_type() {
        let wire = backend().to_wire_request(&ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
            json_mode: true,
        });
        assert_eq!(mime_type_of(&wire), Some("application/json"));
    }

    #[test]
    fn test_json_mode_with_tools_suppresses_mime_type() {
        let wire = backend().to_wire_request(&ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: vec![lookup_schema()],
            json_mode: true,
        });
        assert!(wire.tools.is_some());
        assert!(mime_type_of(&wire).is_none());
    }

    #[test]
    fn test_free_text_never_sets_mime_type() {
        let wire = backend().to_wire_request(&ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
            json_mode: false,
        });
        assert!(mime_type_of(&wire).is_none());
    }
}
