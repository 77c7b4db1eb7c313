//! Agent specifications and their compiled form
//!
//! An [`AgentSpec`] is a declarative description of what an agent should do:
//! purpose, behavioral rules, output contract, execution variant, and tools.
//! Compilation turns it -- once, deterministically -- into a [`CompiledAgent`]
//! holding the assembled system prompt and message template. Binding to a
//! concrete model platform happens later and repeatedly; see `crate::binder`.

pub mod compiler;
pub(crate) mod executor;

pub use executor::MAX_AGENT_TURNS;

use std::sync::Arc;

use crate::backend::{ChatMessage, Platform};
use crate::error::AgentError;
use crate::output::OutputContract;
use crate::prompt::{assemble_system_prompt, render};
use crate::retrieval::InputPreprocessor;
use crate::tool::Tool;

// ============================================================================
// Variants
// ============================================================================

/// Execution strategy, chosen at compile time and never changed after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentVariant {
    /// One direct model call; no loop, no tools.
    Simple,
    /// Bounded tool-calling loop: the model may request tool calls, observe
    /// their results, and repeat until it emits a final answer.
    ToolUsing,
    /// Same loop shape as `ToolUsing`, with reasoning-first framing and a
    /// "Final Answer:" termination marker.
    ReasoningLoop,
}

impl AgentVariant {
    pub fn uses_tools(&self) -> bool {
        matches!(self, Self::ToolUsing | Self::ReasoningLoop)
    }
}

// ============================================================================
// Spec
// ============================================================================

/// The declarative configuration an agent is compiled from. Immutable.
pub struct AgentSpec {
    /// Unique identifier for this agent.
    pub name: String,
    /// Free-text statement of what the agent is for. Leads the system prompt.
    pub purpose: String,
    /// Ordered directives rendered as the "Do" block.
    pub do_list: Vec<String>,
    /// Ordered directives rendered as the "Do Not" block.
    pub do_not_list: Vec<String>,
    /// Optional free text rendered as the "Additional Notes" block.
    pub additional_notes: Option<String>,
    /// Description used when this agent is exposed as a tool to another agent.
    pub as_tool_description: String,
    pub contract: OutputContract,
    pub variant: AgentVariant,
    /// Non-empty exactly when the variant uses tools; enforced at compile.
    pub tools: Vec<Arc<dyn Tool>>,
    /// Platforms this agent may be bound to. Empty means all platforms.
    pub allowed_platforms: Vec<Platform>,
    /// Input transforms applied, in order, before the template is filled.
    pub preprocessors: Vec<Arc<dyn InputPreprocessor>>,
}

impl std::fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("purpose", &self.purpose)
            .field("variant", &self.variant)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl AgentSpec {
    pub fn builder(name: impl Into<String>, purpose: impl Into<String>) -> AgentSpecBuilder {
        AgentSpecBuilder::new(name, purpose)
    }

    fn validate(&self) -> Result<(), AgentError> {
        if self.name.is_empty() {
            return Err(AgentError::Configuration(
                "agent name must not be empty".to_string(),
            ));
        }
        if self.variant.uses_tools() && self.tools.is_empty() {
            return Err(AgentError::Configuration(
                "tool-using variant requires a non-empty tool set".to_string(),
            ));
        }
        if !self.variant.uses_tools() && !self.tools.is_empty() {
            return Err(AgentError::Configuration(format!(
                "variant {:?} does not execute tools, but {} were configured",
                self.variant,
                self.tools.len()
            )));
        }
        Ok(())
    }
}

/// Builder for [`AgentSpec`]. `build()` enforces the spec invariants.
pub struct AgentSpecBuilder {
    name: String,
    purpose: String,
    do_list: Vec<String>,
    do_not_list: Vec<String>,
    additional_notes: Option<String>,
    as_tool_description: Option<String>,
    contract: OutputContract,
    variant: AgentVariant,
    tools: Vec<Arc<dyn Tool>>,
    allowed_platforms: Vec<Platform>,
    preprocessors: Vec<Arc<dyn InputPreprocessor>>,
}

impl AgentSpecBuilder {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            do_list: Vec::new(),
            do_not_list: Vec::new(),
            additional_notes: None,
            as_tool_description: None,
            contract: OutputContract::FreeText,
            variant: AgentVariant::Simple,
            tools: Vec::new(),
            allowed_platforms: Vec::new(),
            preprocessors: Vec::new(),
        }
    }

    pub fn do_item(mut self, item: impl Into<String>) -> Self {
        self.do_list.push(item.into());
        self
    }

    pub fn do_not_item(mut self, item: impl Into<String>) -> Self {
        self.do_not_list.push(item.into());
        self
    }

    pub fn additional_notes(mut self, notes: impl Into<String>) -> Self {
        self.additional_notes = Some(notes.into());
        self
    }

    pub fn as_tool_description(mut self, description: impl Into<String>) -> Self {
        self.as_tool_description = Some(description.into());
        self
    }

    pub fn contract(mut self, contract: OutputContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn variant(mut self, variant: AgentVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn allow_platform(mut self, platform: Platform) -> Self {
        self.allowed_platforms.push(platform);
        self
    }

    pub fn preprocessor(mut self, preprocessor: Arc<dyn InputPreprocessor>) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }

    pub fn build(self) -> Result<AgentSpec, AgentError> {
        let as_tool_description = self
            .as_tool_description
            .unwrap_or_else(|| self.purpose.clone());
        let spec = AgentSpec {
            name: self.name,
            purpose: self.purpose,
            do_list: self.do_list,
            do_not_list: self.do_not_list,
            additional_notes: self.additional_notes,
            as_tool_description,
            contract: self.contract,
            variant: self.variant,
            tools: self.tools,
            allowed_platforms: self.allowed_platforms,
            preprocessors: self.preprocessors,
        };
        spec.validate()?;
        Ok(spec)
    }
}

// ============================================================================
// Compiled form
// ============================================================================

/// Input to a single invocation. Passed untouched through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct InvocationInput {
    pub input: String,
    pub additional_instructions: Option<String>,
}

impl InvocationInput {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            additional_instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.additional_instructions = Some(instructions.into());
        self
    }
}

/// One slot in the ordered message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateMessage {
    /// System text; carries the `{additional_instructions}` placeholder and,
    /// for tool variants, `{tools}` / `{tool_names}`.
    System(String),
    /// Human text; carries the `{input}` placeholder.
    Human(String),
    /// Insertion point for the running tool-loop transcript.
    Scratchpad,
}

const TOOL_FRAMING: &str = "\n\nYou are equipped with a set of tools, as follows:\n{tools}\n\n\
When a tool would help, call it. Each tool result will be returned to you as an observation; \
incorporate it and keep going. Once you are satisfied with the state of your work, return your \
final answer using the format specified above.";

const REASONING_FRAMING: &str = "\n\nYou are equipped with a set of tools, as follows:\n{tools}\n\n\
Please follow the strategy below to complete your task. Most of these steps require thinking. \
You should always think, and write out your thoughts.\n\n\
1. identify a single question you're trying to answer. Generally speaking, you want to ask \
yourself - \"what is my best next step towards my goal?\"\n\
2. given your identified question, provide yourself with a simple strategy for how you want to \
address it.\n\
3. Action:\n\
  a. If the action would benefit from the use of one of these tools, do that: [{tool_names}]. \
If you choose this route, think carefully about your input to the tool and document it.\n\
  b. If the action does not require the use of a tool, write out a note to yourself as to how \
to proceed without a tool.\n\
4. Whatever action you took, note down your observations and the results of your action.\n\
5. Repeat steps 1-4 until you have completed your task.\n\
6. Once you are satisfied with the state of your work, prefix your reply with \"Final Answer:\" \
and return your response using the format specified above.";

const INPUT_MESSAGE: &str =
    "Please perform your assigned duties against the following input:\n\n{input}";

/// An agent spec after deterministic compilation: assembled system prompt,
/// ordered message template, and everything binding needs. Immutable.
pub struct CompiledAgent {
    pub name: String,
    pub system_prompt: String,
    pub template: Vec<TemplateMessage>,
    pub variant: AgentVariant,
    pub contract: OutputContract,
    pub as_tool_description: String,
    pub(crate) tools: Vec<Arc<dyn Tool>>,
    allowed_platforms: Vec<Platform>,
    pub(crate) preprocessors: Vec<Arc<dyn InputPreprocessor>>,
}

impl CompiledAgent {
    /// Compile a spec. Deterministic; fails with a configuration error rather
    /// than returning a partially-usable agent.
    pub fn compile(spec: &AgentSpec) -> Result<Self, AgentError> {
        spec.validate()?;

        let mut system_prompt = assemble_system_prompt(
            &spec.purpose,
            &spec.do_list,
            &spec.do_not_list,
            spec.additional_notes.as_deref(),
            &spec.contract,
        );

        match spec.variant {
            AgentVariant::Simple => {}
            AgentVariant::ToolUsing => system_prompt.push_str(TOOL_FRAMING),
            AgentVariant::ReasoningLoop => system_prompt.push_str(REASONING_FRAMING),
        }

        let mut template = vec![
            TemplateMessage::System(system_prompt.clone()),
            TemplateMessage::Human(INPUT_MESSAGE.to_string()),
        ];
        if spec.variant.uses_tools() {
            template.push(TemplateMessage::Scratchpad);
        }

        Ok(Self {
            name: spec.name.clone(),
            system_prompt,
            template,
            variant: spec.variant,
            contract: spec.contract.clone(),
            as_tool_description: spec.as_tool_description.clone(),
            tools: spec.tools.clone(),
            allowed_platforms: spec.allowed_platforms.clone(),
            preprocessors: spec.preprocessors.clone(),
        })
    }

    /// Whether this agent may be bound to the given platform.
    pub fn allows(&self, platform: Platform) -> bool {
        self.allowed_platforms.is_empty() || self.allowed_platforms.contains(&platform)
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Fill the template with runtime values and produce the opening
    /// transcript for an invocation. The scratchpad slot contributes nothing
    /// here; the loop appends to the transcript as it runs.
    pub(crate) fn render_messages(&self, input: &InvocationInput) -> Vec<ChatMessage> {
        let tool_lines: String = self
            .tools
            .iter()
            .map(|t| format!("* {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names: String = self
            .tools
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let instructions = input.additional_instructions.as_deref().unwrap_or("");

        let vars: Vec<(&str, &str)> = vec![
            ("additional_instructions", instructions),
            ("input", &input.input),
            ("tools", &tool_lines),
            ("tool_names", &tool_names),
        ];

        self.template
            .iter()
            .filter_map(|slot| match slot {
                TemplateMessage::System(text) => Some(ChatMessage::system(render(text, &vars))),
                TemplateMessage::Human(text) => Some(ChatMessage::user(render(text, &vars))),
                TemplateMessage::Scratchpad => None,
            })
            .collect()
    }
}
