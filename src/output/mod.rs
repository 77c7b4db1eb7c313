//! Output contracts
//!
//! An agent declares up front whether it returns structured JSON or free
//! text. The contract contributes its instruction block to the system prompt
//! and owns the parse rule applied to raw model output.

pub mod extract;

use serde_json::Value;

use crate::error::AgentError;
use crate::prompt::escape_braces;

/// The expected shape of an agent's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputContract {
    /// The agent must return a JSON object matching the given schema text.
    /// The schema is human-readable and embedded verbatim in the prompt.
    Structured { schema: String },
    /// The agent returns prose; parsing is the identity.
    FreeText,
}

impl OutputContract {
    pub fn structured(schema: impl Into<String>) -> Self {
        Self::Structured {
            schema: schema.into(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }

    /// The instruction block embedded at the end of the system prompt.
    ///
    /// Literal braces in the schema are escaped to their doubled form because
    /// the surrounding template uses single braces as placeholder delimiters.
    pub fn prompt_instructions(&self) -> String {
        match self {
            Self::Structured { schema } => format!(
                "Please return your output in compliance with the JSON schema below.\n\
                 DO NOT wrap the output in any kind of text or even any kind of code fence, \
                 it is essential that you return valid JSON that is machine parsable.\n\
                 The first character of your output MUST be '{{{{' and the last character MUST be '}}}}'.\n\n\
                 Output Schema:\n{}",
                escape_braces(schema)
            ),
            Self::FreeText => "Please return your output in markdown format.".to_string(),
        }
    }

    /// Parse raw model output against this contract.
    ///
    /// Structured contracts run the extractor/repairer first; FreeText passes
    /// the text through unchanged.
    pub fn parse(&self, raw: &str) -> Result<AgentOutput, AgentError> {
        match self {
            Self::Structured { .. } => extract::structured_value(raw).map(AgentOutput::Structured),
            Self::FreeText => Ok(AgentOutput::Text(raw.to_string())),
        }
    }
}

/// A parsed invocation result.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Structured(Value),
    Text(String),
}

impl AgentOutput {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_free_text_parse_is_identity() {
        let contract = OutputContract::FreeText;
        let out = contract.parse("anything at all").unwrap();
        assert_eq!(out.as_text(), Some("anything at all"));
    }

    #[test]
    fn test_structured_parse_goes_through_extractor() {
        let contract = OutputContract::structured(r#"{"k": string}"#);
        let out = contract.parse("noise {\"k\": \"v\"} more noise").unwrap();
        assert_eq!(out.as_value(), Some(&json!({"k": "v"})));
    }

    #[test]
    fn test_instructions_escape_schema_braces() {
        let contract = OutputContract::structured(r#"{"k": string}"#);
        let instructions = contract.prompt_instructions();
        assert!(instructions.contains(r#"{{"k": string}}"#));
        assert!(!instructions.contains(r#"\n{"k""#));
    }

    #[test]
    fn test_free_text_instructions() {
        assert!(OutputContract::FreeText
            .prompt_instructions()
            .contains("markdown"));
    }
}
