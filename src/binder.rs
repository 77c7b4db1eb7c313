//! Backend binding
//!
//! A [`Binder`] owns one HTTP client plus credentials for whichever platforms
//! the host application configured, and turns a compiled agent into a
//! [`BoundAgent`] against one of them. Per-platform defaults (model,
//! temperature, JSON-output quirks) are applied here and nowhere else;
//! user-supplied [`BindOptions`] merge over the defaults field by field.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::agent::{executor, CompiledAgent, InvocationInput};
use crate::backend::{
    AnthropicBackend, AnthropicConfig, ChatBackend, GeminiBackend, GeminiConfig, OpenAiBackend,
    OpenAiConfig, Platform,
};
use crate::error::AgentError;
use crate::output::AgentOutput;
use crate::telemetry::{InvocationTrace, Telemetry};
use crate::tool::{Tool, ToolError};

/// Per-binding overrides. Anything left `None` falls back to the platform
/// default (model per platform, temperature 0).
#[derive(Debug, Clone, Default)]
pub struct BindOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Holds platform credentials and constructs bound agents.
#[derive(Clone, Default)]
pub struct Binder {
    client: reqwest::Client,
    openai: Option<OpenAiConfig>,
    anthropic: Option<AnthropicConfig>,
    gemini: Option<GeminiConfig>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable OpenAI with an API key and the default base URL.
    pub fn with_openai(self, api_key: impl Into<String>) -> Self {
        let base = OpenAiConfig::default().base_url;
        self.with_openai_at(api_key, base)
    }

    pub fn with_openai_at(mut self, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.openai = Some(OpenAiConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        });
        self
    }

    /// Enable Anthropic with an API key and the default base URL.
    pub fn with_anthropic(self, api_key: impl Into<String>) -> Self {
        let base = AnthropicConfig::default().base_url;
        self.with_anthropic_at(api_key, base)
    }

    pub fn with_anthropic_at(
        mut self,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        self.anthropic = Some(AnthropicConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        });
        self
    }

    /// Enable Gemini with an API key and the default base URL.
    pub fn with_gemini(self, api_key: impl Into<String>) -> Self {
        let base = GeminiConfig::default().base_url;
        self.with_gemini_at(api_key, base)
    }

    pub fn with_gemini_at(mut self, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.gemini = Some(GeminiConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        });
        self
    }

    /// Platforms this binder has credentials for.
    pub fn configured_platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        if self.openai.is_some() {
            platforms.push(Platform::OpenAi);
        }
        if self.anthropic.is_some() {
            platforms.push(Platform::Anthropic);
        }
        if self.gemini.is_some() {
            platforms.push(Platform::Gemini);
        }
        platforms
    }

    /// Bind a compiled agent to a built-in platform.
    ///
    /// Fails with `PlatformNotAllowed` when the agent's allowed-platform set
    /// excludes the target, and `PlatformNotSupported` when this binder holds
    /// no credentials for it. No partially-usable agent is ever returned.
    pub fn bind(
        &self,
        compiled: &Arc<CompiledAgent>,
        platform: Platform,
        options: Option<BindOptions>,
    ) -> Result<BoundAgent, AgentError> {
        if !compiled.allows(platform) {
            return Err(AgentError::PlatformNotAllowed {
                agent: compiled.name.clone(),
                platform,
            });
        }

        let options = options.unwrap_or_default();
        let backend: Arc<dyn ChatBackend> = match platform {
            Platform::OpenAi => {
                let config = self
                    .openai
                    .clone()
                    .ok_or(AgentError::PlatformNotSupported(platform))?;
                Arc::new(OpenAiBackend::new(
                    self.client.clone(),
                    config,
                    options.model,
                    options.temperature,
                    options.max_tokens,
                ))
            }
            Platform::Anthropic => {
                let config = self
                    .anthropic
                    .clone()
                    .ok_or(AgentError::PlatformNotSupported(platform))?;
                Arc::new(AnthropicBackend::new(
                    self.client.clone(),
                    config,
                    options.model,
                    options.temperature,
                    options.max_tokens,
                ))
            }
            Platform::Gemini => {
                let config = self
                    .gemini
                    .clone()
                    .ok_or(AgentError::PlatformNotSupported(platform))?;
                Arc::new(GeminiBackend::new(
                    self.client.clone(),
                    config,
                    options.model,
                    options.temperature,
                    options.max_tokens,
                ))
            }
        };

        Ok(BoundAgent {
            compiled: Arc::clone(compiled),
            backend,
            telemetry: None,
        })
    }

    /// Bind against an arbitrary backend adapter. The allowed-platform set is
    /// not consulted: a custom adapter is outside the built-in platform enum
    /// and the caller vouches for it.
    pub fn bind_backend(
        &self,
        compiled: &Arc<CompiledAgent>,
        backend: Arc<dyn ChatBackend>,
    ) -> BoundAgent {
        BoundAgent {
            compiled: Arc::clone(compiled),
            backend,
            telemetry: None,
        }
    }
}

// ============================================================================
// Bound agents
// ============================================================================

/// A compiled agent plus a concrete backend: the invocable form.
///
/// Holds no mutable per-call state, so a single `BoundAgent` may be invoked
/// from multiple call sites concurrently.
pub struct BoundAgent {
    compiled: Arc<CompiledAgent>,
    backend: Arc<dyn ChatBackend>,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl std::fmt::Debug for BoundAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundAgent")
            .field("name", &self.compiled.name)
            .finish_non_exhaustive()
    }
}

impl BoundAgent {
    pub fn name(&self) -> &str {
        &self.compiled.name
    }

    pub fn compiled(&self) -> &CompiledAgent {
        &self.compiled
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    /// Attach a telemetry sink. Traces are recorded per invocation.
    pub fn with_telemetry(mut self, sink: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Execute the agent's variant strategy and return the raw model text,
    /// without extraction or parsing.
    pub async fn invoke_raw(
        &self,
        input: impl Into<String>,
        additional_instructions: Option<&str>,
    ) -> Result<String, AgentError> {
        let mut invocation = InvocationInput::new(input);
        if let Some(instructions) = additional_instructions {
            invocation = invocation.with_instructions(instructions);
        }

        let started_at = Utc::now();
        let result = executor::run(&self.compiled, self.backend.as_ref(), &invocation).await;

        if let Some(sink) = &self.telemetry {
            let (turns, tool_calls, error) = match &result {
                Ok(report) => (report.turns, report.tool_calls, None),
                Err(e) => (0, 0, Some(e.to_string())),
            };
            sink.record(InvocationTrace {
                agent: self.compiled.name.clone(),
                platform: self.backend.platform_name().to_string(),
                model: self.backend.model_name().to_string(),
                started_at,
                finished_at: Utc::now(),
                turns,
                tool_calls,
                error,
            });
        }

        result.map(|report| report.output)
    }

    /// Execute and parse against the agent's output contract: extraction plus
    /// JSON parsing for structured contracts, passthrough for free text.
    pub async fn invoke(
        &self,
        input: impl Into<String>,
        additional_instructions: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        let raw = self.invoke_raw(input, additional_instructions).await?;
        self.compiled.contract.parse(&raw)
    }

    /// Expose this bound agent as a tool, so its output can feed another
    /// agent's tool-using loop.
    pub fn as_tool(self: &Arc<Self>) -> Arc<dyn Tool> {
        Arc::new(AgentTool {
            agent: Arc::clone(self),
            description: format!(
                "This tool exposes the {} behavior. It takes an object with a required \"input\" \
                 string and an optional \"additional_instructions\" string. Use \
                 \"additional_instructions\" to parameterize and constrain the default behavior \
                 on a case-by-case basis as necessary.\nThe tool's description is as follows: {}",
                self.compiled.name, self.compiled.as_tool_description
            ),
        })
    }
}

/// A bound agent wrapped as a tool.
struct AgentTool {
    agent: Arc<BoundAgent>,
    description: String,
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        self.agent.name()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": { "type": "string" },
                "additional_instructions": { "type": "string" }
            },
            "required": ["input"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let input = args
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::BadArguments("missing required 'input' string".to_string()))?;
        let instructions = args.get("additional_instructions").and_then(|v| v.as_str());

        self.agent
            .invoke_raw(input, instructions)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSpec;

    fn compiled() -> Arc<CompiledAgent> {
        let spec = AgentSpec::builder("x", "P")
            .allow_platform(Platform::OpenAi)
            .build()
            .unwrap();
        Arc::new(CompiledAgent::compile(&spec).unwrap())
    }

    #[test]
    fn test_unconfigured_platform_is_not_supported() {
        let binder = Binder::new();
        let err = binder.bind(&compiled(), Platform::OpenAi, None).unwrap_err();
        assert!(matches!(err, AgentError::PlatformNotSupported(Platform::OpenAi)));
    }

    #[test]
    fn test_disallowed_platform_is_rejected_before_credentials() {
        // No gemini credentials either, but the allowed-set check comes first.
        let binder = Binder::new();
        let err = binder.bind(&compiled(), Platform::Gemini, None).unwrap_err();
        match err {
            AgentError::PlatformNotAllowed { agent, platform } => {
                assert_eq!(agent, "x");
                assert_eq!(platform, Platform::Gemini);
            }
            other => panic!("expected PlatformNotAllowed, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_applies_platform_defaults_and_overrides() {
        let binder = Binder::new().with_openai("key");
        let bound = binder.bind(&compiled(), Platform::OpenAi, None).unwrap();
        assert_eq!(bound.backend().model_name(), "gpt-4-turbo");

        let bound = binder
            .bind(
                &compiled(),
                Platform::OpenAi,
                Some(BindOptions {
                    model: Some("gpt-4o".to_string()),
                    ..Default::default()
                }),
            )
            .unwrap();
        assert_eq!(bound.backend().model_name(), "gpt-4o");
    }

    #[test]
    fn test_configured_platforms() {
        let binder = Binder::new().with_anthropic("key");
        assert_eq!(binder.configured_platforms(), vec![Platform::Anthropic]);
    }

    #[test]
    fn test_binding_twice_yields_equivalent_agents() {
        let binder = Binder::new().with_openai("key");
        let compiled = compiled();
        let a = binder.bind(&compiled, Platform::OpenAi, None).unwrap();
        let b = binder.bind(&compiled, Platform::OpenAi, None).unwrap();
        assert_eq!(a.compiled().system_prompt, b.compiled().system_prompt);
        assert_eq!(a.backend().model_name(), b.backend().model_name());
    }
}
