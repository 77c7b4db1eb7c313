//! Model backend adapters
//!
//! Every provider is normalized behind the [`ChatBackend`] capability: a
//! unified message format, a unified tool-call representation, and a single
//! `chat` entry point. Provider quirks (JSON-mode flags, tool wire formats,
//! system-message placement) live inside the adapters and never leak out.

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use error::BackendError;
pub use gemini::{GeminiBackend, GeminiConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};

// ============================================================================
// Platforms
// ============================================================================

/// The model platforms the built-in binder knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    OpenAi,
    Anthropic,
    Gemini,
}

impl Platform {
    /// All built-in platforms, in binder preference order.
    pub const ALL: [Platform; 3] = [Platform::OpenAi, Platform::Anthropic, Platform::Gemini];
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::OpenAi => write!(f, "openai"),
            Platform::Anthropic => write!(f, "anthropic"),
            Platform::Gemini => write!(f, "gemini"),
        }
    }
}

// ============================================================================
// Unified message format
// ============================================================================

/// Message roles in the unified chat format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    /// Provider-assigned id, or a synthesized one when the provider has none.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A single message in the unified chat format.
///
/// `name` and `tool_call_id` are only populated for tool-result messages;
/// `tool_calls` only for assistant messages that requested tools.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub name: Option<String>,
    pub tool_call_id: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// An assistant turn that requested one or more tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: calls,
        }
    }

    /// The observed result of a tool call, fed back to the model.
    pub fn tool(
        name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// Declared shape of a tool, as advertised to the model.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: Value,
}

/// A single request against a backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    /// True when the agent's contract is structured. Adapters translate this
    /// into whatever their platform needs (or nothing, if the platform infers
    /// JSON output from the prompt alone).
    pub json_mode: bool,
}

/// A normalized backend reply.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<String>,
}

// ============================================================================
// The backend capability
// ============================================================================

/// Narrow capability every model adapter must satisfy.
///
/// Adapters hold their own credentials, model choice, and sampling options;
/// callers only supply messages and tool declarations. Implementations must
/// be safe to call concurrently.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short platform identifier, e.g. "openai".
    fn platform_name(&self) -> &str;

    /// The concrete model this adapter will call.
    fn model_name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError>;
}
