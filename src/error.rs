use thiserror::Error;

use crate::backend::{error::BackendError, Platform};

/// Errors surfaced by the compile -> bind -> invoke pipeline.
///
/// Compile/bind-time variants abort construction entirely; invocation-time
/// variants reject a single call without corrupting the bound agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent spec: {0}")]
    Configuration(String),

    #[error("platform {platform} is not allowed for agent '{agent}'")]
    PlatformNotAllowed { agent: String, platform: Platform },

    #[error("platform {0} is not configured on this binder")]
    PlatformNotSupported(Platform),

    #[error("no JSON object boundaries found in model output: {raw}")]
    Extraction { raw: String },

    #[error("model output failed to parse against the contract (slice: {slice}): {source}")]
    Parse {
        slice: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("agent did not reach a final answer within {0} turns")]
    IterationLimit(usize),

    #[error("input preprocessing failed: {0}")]
    Preprocess(String),

    #[error("knowledge store error: {0}")]
    Store(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
