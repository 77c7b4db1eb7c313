//! # Promptforge
//!
//! A compile-once, bind-many agent engine: declarative agent specifications
//! compiled into prompt templates, then bound to interchangeable model
//! platforms.
//!
//! ## Features
//!
//! - **Declarative specs**: Describe an agent once (purpose, rules, output
//!   contract, tools) and let compilation assemble the prompt
//! - **Platform independence**: One compiled agent binds to OpenAI, Anthropic,
//!   or Gemini; per-platform wire quirks live in the backend adapters
//! - **Bounded tool loops**: Tool-using and reasoning variants run a capped
//!   loop where tool failures are observations the model can recover from
//! - **Structured output**: JSON contracts with extraction and repair of the
//!   noise models actually produce
//! - **Composable agents**: Any bound agent can be exposed as a tool inside
//!   another agent's loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promptforge::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), promptforge::AgentError> {
//! let spec = AgentSpec::builder("summarizer", "You distill technical prose into summaries.")
//!     .do_item("Keep every summary under five sentences.")
//!     .do_not_item("Do not editorialize.")
//!     .build()?;
//!
//! let compiled = Arc::new(CompiledAgent::compile(&spec)?);
//!
//! let binder = Binder::new().with_openai(std::env::var("OPENAI_API_KEY").unwrap_or_default());
//! let bound = binder.bind(&compiled, Platform::OpenAi, None)?;
//!
//! let summary = bound.invoke_raw("...document text...", None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`]: Specs, compilation, the compile/bind orchestrator
//! - [`backend`]: The unified chat trait and the per-platform adapters
//! - [`binder`]: Credentials, platform defaults, bound agents
//! - [`output`]: Output contracts, extraction, repair
//! - [`tool`]: The tool capability trait and closure-backed tools
//! - [`retrieval`] / [`graph`]: Grounding collaborators (RAG injection,
//!   knowledge-graph surface)
//! - [`prelude`]: Commonly used types (import with `use promptforge::prelude::*`)

// ============================================================================
// Modules
// ============================================================================

pub mod agent;
pub mod backend;
pub mod binder;
pub mod error;
pub mod graph;
pub mod output;
pub mod prompt;
pub mod retrieval;
pub mod telemetry;
pub mod tool;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Specs and compilation
pub use agent::compiler::AgentCompiler;
pub use agent::{
    AgentSpec, AgentSpecBuilder, AgentVariant, CompiledAgent, InvocationInput, TemplateMessage,
    MAX_AGENT_TURNS,
};

// Binding
pub use binder::{BindOptions, Binder, BoundAgent};

// Backends
pub use backend::{
    AnthropicBackend, AnthropicConfig, BackendError, ChatBackend, ChatMessage, ChatReply,
    ChatRequest, GeminiBackend, GeminiConfig, OpenAiBackend, OpenAiConfig, Platform, Role,
    ToolCallRequest, ToolSchema,
};

// Output contracts
pub use output::{AgentOutput, OutputContract};

// Tools
pub use tool::{FunctionTool, Tool, ToolError};

// Errors
pub use error::AgentError;

// Grounding collaborators
pub use graph::{CanonicalMapping, Concept, Edge, GraphData, GraphLookupTool, KnowledgeGraphStore};
pub use retrieval::{ContextRetriever, InputPreprocessor, RagInjector};

// Telemetry
pub use telemetry::{InvocationTrace, MemoryTelemetry, Telemetry};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything you need to define, compile, bind,
/// and invoke agents.
///
/// # Example
/// ```rust
/// use promptforge::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        AgentCompiler,
        AgentError,
        AgentOutput,
        // Specs
        AgentSpec,
        AgentSpecBuilder,
        AgentVariant,
        BindOptions,
        // Binding
        Binder,
        BoundAgent,
        // Backends
        ChatBackend,
        ChatMessage,
        ChatReply,
        ChatRequest,
        CompiledAgent,
        FunctionTool,
        InvocationInput,
        // Output
        OutputContract,
        Platform,
        // Tools
        Tool,
        ToolError,
    };
}
