//! Variant execution strategies
//!
//! Simple agents are a single chat call. Tool-using and reasoning agents run
//! a bounded loop: the model requests tool calls, each observed result is
//! appended to the transcript, and the loop ends when the model replies with
//! no tool calls (or, for the reasoning variant, emits its final-answer
//! marker). Tool failures are observations the model can recover from, never
//! fatal; only exhausting the turn budget is an error.

use crate::agent::{AgentVariant, CompiledAgent, InvocationInput};
use crate::backend::{ChatBackend, ChatMessage, ChatRequest, ToolSchema};
use crate::error::AgentError;
use crate::tool::schema_of;

/// Upper bound on model turns for the looped variants.
pub const MAX_AGENT_TURNS: usize = 12;

const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// What a finished invocation looked like, for telemetry.
pub(crate) struct ExecutionReport {
    pub output: String,
    pub turns: usize,
    pub tool_calls: usize,
}

pub(crate) async fn run(
    compiled: &CompiledAgent,
    backend: &dyn ChatBackend,
    input: &InvocationInput,
) -> Result<ExecutionReport, AgentError> {
    let mut input = input.clone();
    for preprocessor in &compiled.preprocessors {
        input.input = preprocessor.apply(input.input).await?;
    }

    let json_mode = compiled.contract.is_structured();
    let messages = compiled.render_messages(&input);

    match compiled.variant {
        AgentVariant::Simple => {
            let reply = backend
                .chat(ChatRequest {
                    messages,
                    tools: Vec::new(),
                    json_mode,
                })
                .await?;
            Ok(ExecutionReport {
                output: reply.content,
                turns: 1,
                tool_calls: 0,
            })
        }
        AgentVariant::ToolUsing | AgentVariant::ReasoningLoop => {
            run_loop(compiled, backend, messages, json_mode).await
        }
    }
}

async fn run_loop(
    compiled: &CompiledAgent,
    backend: &dyn ChatBackend,
    mut messages: Vec<ChatMessage>,
    json_mode: bool,
) -> Result<ExecutionReport, AgentError> {
    let tool_schemas: Vec<ToolSchema> = compiled
        .tools
        .iter()
        .map(|t| schema_of(t.as_ref()))
        .collect();
    let tool_names: Vec<&str> = compiled.tools.iter().map(|t| t.name()).collect();
    let mut total_tool_calls = 0;

    for turn in 1..=MAX_AGENT_TURNS {
        let reply = backend
            .chat(ChatRequest {
                messages: messages.clone(),
                tools: tool_schemas.clone(),
                json_mode,
            })
            .await?;

        // The reasoning variant terminates on its marker even if the model
        // also queued tool calls.
        if compiled.variant == AgentVariant::ReasoningLoop {
            if let Some(idx) = reply.content.find(FINAL_ANSWER_MARKER) {
                let output = reply.content[idx + FINAL_ANSWER_MARKER.len()..]
                    .trim()
                    .to_string();
                return Ok(ExecutionReport {
                    output,
                    turns: turn,
                    tool_calls: total_tool_calls,
                });
            }
        }

        if reply.tool_calls.is_empty() {
            return Ok(ExecutionReport {
                output: reply.content,
                turns: turn,
                tool_calls: total_tool_calls,
            });
        }

        messages.push(ChatMessage::assistant_with_calls(
            reply.content,
            reply.tool_calls.clone(),
        ));

        for call in reply.tool_calls {
            total_tool_calls += 1;
            let observation = match compiled.tools.iter().find(|t| t.name() == call.name) {
                Some(tool) => match tool.invoke(call.arguments.clone()).await {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!(
                            "agent '{}': tool '{}' failed on turn {}: {}",
                            compiled.name,
                            call.name,
                            turn,
                            e
                        );
                        format!(
                            "Tool '{}' failed: {}. You may adjust your arguments and try again.",
                            call.name, e
                        )
                    }
                },
                None => {
                    log::warn!(
                        "agent '{}': model requested unknown tool '{}'",
                        compiled.name,
                        call.name
                    );
                    format!(
                        "No tool named '{}' is available. Available tools: {}.",
                        call.name,
                        tool_names.join(", ")
                    )
                }
            };
            messages.push(ChatMessage::tool(call.name, call.id, observation));
        }
    }

    Err(AgentError::IterationLimit(MAX_AGENT_TURNS))
}
