//! Tool capability
//!
//! Anything with a name, a description, a declared parameter schema, and an
//! async `invoke` qualifies as a tool -- regardless of how it is implemented.
//! [`FunctionTool`] wraps a plain closure; bound agents can themselves be
//! exposed as tools (see `binder::BoundAgent::as_tool`).

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::backend::ToolSchema;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("bad tool arguments: {0}")]
    BadArguments(String),

    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// Narrow capability interface for tools.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the tool's arguments.
    fn parameters(&self) -> Value;

    async fn invoke(&self, args: Value) -> Result<String, ToolError>;
}

/// Build the schema advertised to backends for a tool.
pub(crate) fn schema_of(tool: &dyn Tool) -> ToolSchema {
    ToolSchema {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters(),
    }
}

type ToolFn = Box<dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// A tool backed by an async closure.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
    func: ToolFn,
}

impl FunctionTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        func: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Box::new(move |args| Box::pin(func(args))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        (self.func)(args).await
    }
}
