//! Input preprocessing and retrieval grounding
//!
//! Preprocessors run in spec order against the invocation input, before the
//! message template is rendered. [`RagInjector`] is the built-in one: it asks
//! a [`ContextRetriever`] for passages relevant to the input and prepends them
//! as a delimited grounding block, instructing the model to answer from that
//! block rather than from latent knowledge.

use async_trait::async_trait;

use crate::error::AgentError;

/// A source of retrieval passages for grounding.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, AgentError>;
}

/// Transforms invocation input before template rendering.
///
/// Failures abort the invocation; a preprocessor that can degrade gracefully
/// should return the input unchanged instead.
#[async_trait]
pub trait InputPreprocessor: Send + Sync {
    async fn apply(&self, input: String) -> Result<String, AgentError>;
}

const RAG_BLOCK_OPEN: &str = "BEGIN_RAG_DATA---------------------";
const RAG_BLOCK_CLOSE: &str = "---------------------END_RAG_DATA";

/// Prepends retrieved passages to the input as a grounding block.
pub struct RagInjector {
    retriever: std::sync::Arc<dyn ContextRetriever>,
}

impl RagInjector {
    pub fn new(retriever: std::sync::Arc<dyn ContextRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl InputPreprocessor for RagInjector {
    async fn apply(&self, input: String) -> Result<String, AgentError> {
        let passages = self.retriever.retrieve(&input).await?;
        if passages.is_empty() {
            log::debug!("retriever returned no passages; passing input through");
            return Ok(input);
        }
        let injection = passages.join("\n\n");

        Ok(format!(
            "The following information comes from a RAG-based flow. You should derive your \
             response specifically from this information, rather than relying on knowledge latent \
             within your own memory. If the question the user asks cannot be answered using this \
             information, please simply state that you do not have enough information to provide \
             a complete answer - but do the best you can to address the user query with the rag \
             data within the information below:\n\n\
             {RAG_BLOCK_OPEN}\n{injection}\n{RAG_BLOCK_CLOSE}\n\n{input}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FixedRetriever(Vec<String>);

    #[async_trait]
    impl ContextRetriever for FixedRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<String>, AgentError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl ContextRetriever for FailingRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<String>, AgentError> {
            Err(AgentError::Store("index unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_injector_wraps_passages_and_keeps_input_last() {
        let injector = RagInjector::new(Arc::new(FixedRetriever(vec![
            "passage one".to_string(),
            "passage two".to_string(),
        ])));

        let out = injector.apply("what is rust?".to_string()).await.unwrap();
        let open = out.find(RAG_BLOCK_OPEN).unwrap();
        let close = out.find(RAG_BLOCK_CLOSE).unwrap();
        assert!(open < close);
        assert!(out[open..close].contains("passage one\n\npassage two"));
        assert!(out.ends_with("what is rust?"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_passes_input_through() {
        let injector = RagInjector::new(Arc::new(FixedRetriever(Vec::new())));
        let out = injector.apply("query".to_string()).await.unwrap();
        assert_eq!(out, "query");
    }

    #[tokio::test]
    async fn test_retriever_failure_propagates() {
        let injector = RagInjector::new(Arc::new(FailingRetriever));
        assert!(injector.apply("query".to_string()).await.is_err());
    }
}
