//! Knowledge-graph storage surface
//!
//! Agents that extract structured knowledge need somewhere to put it, and
//! agents that answer from it need a way to look it up mid-loop. The store
//! itself (vector index, graph database, both) is the host application's
//! concern; this module fixes the trait surface and the value types moving
//! across it, and wraps point lookup as a [`Tool`] so a tool-using agent can
//! consult the store while reasoning.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::tool::{Tool, ToolError};

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub label: String,
}

/// A directed, typed relationship between two concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub relationship: String,
}

/// One extraction batch, written atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub concepts: Vec<Concept>,
    pub edges: Vec<Edge>,
}

/// Resolution of a proposed concept label against labels already in the
/// store. An empty candidate list means the label is new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMapping {
    pub proposed: String,
    pub candidates: Vec<Concept>,
}

/// Storage backend for extracted knowledge.
#[async_trait]
pub trait KnowledgeGraphStore: Send + Sync {
    /// Upsert a batch of concepts and edges.
    async fn write(&self, data: GraphData) -> Result<(), AgentError>;

    /// Match proposed labels against existing concepts, so extraction agents
    /// reuse canonical nodes instead of minting near-duplicates.
    async fn canonicalize(&self, labels: Vec<String>) -> Result<Vec<CanonicalMapping>, AgentError>;

    /// Passages known about a single concept.
    async fn lookup(&self, concept: &str) -> Result<Vec<String>, AgentError>;
}

/// Point lookup against a [`KnowledgeGraphStore`], as a tool.
pub struct GraphLookupTool {
    store: Arc<dyn KnowledgeGraphStore>,
}

impl GraphLookupTool {
    pub fn new(store: Arc<dyn KnowledgeGraphStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GraphLookupTool {
    fn name(&self) -> &str {
        "knowledge_graph_lookup"
    }

    fn description(&self) -> &str {
        "Look up what the knowledge graph records about a single concept. \
         Takes an object with a required \"concept\" string and returns the \
         known passages, one per line."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "concept": { "type": "string" }
            },
            "required": ["concept"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let concept = args
            .get("concept")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ToolError::BadArguments("missing required 'concept' string".to_string())
            })?;

        let passages = self
            .store
            .lookup(concept)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        if passages.is_empty() {
            return Ok(format!("Nothing is recorded about '{}'.", concept));
        }
        Ok(passages.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        concepts: Mutex<Vec<Concept>>,
        passages: Mutex<HashMap<String, Vec<String>>>,
    }

    #[async_trait]
    impl KnowledgeGraphStore for MemoryStore {
        async fn write(&self, data: GraphData) -> Result<(), AgentError> {
            self.concepts.lock().unwrap().extend(data.concepts);
            Ok(())
        }

        async fn canonicalize(
            &self,
            labels: Vec<String>,
        ) -> Result<Vec<CanonicalMapping>, AgentError> {
            let concepts = self.concepts.lock().unwrap();
            Ok(labels
                .into_iter()
                .map(|proposed| {
                    let candidates = concepts
                        .iter()
                        .filter(|c| c.label.eq_ignore_ascii_case(&proposed))
                        .cloned()
                        .collect();
                    CanonicalMapping {
                        proposed,
                        candidates,
                    }
                })
                .collect())
        }

        async fn lookup(&self, concept: &str) -> Result<Vec<String>, AgentError> {
            Ok(self
                .passages
                .lock()
                .unwrap()
                .get(concept)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_canonicalize_matches_existing_labels() {
        let store = MemoryStore::default();
        store
            .write(GraphData {
                concepts: vec![Concept {
                    id: "c1".to_string(),
                    label: "Rust".to_string(),
                }],
                edges: Vec::new(),
            })
            .await
            .unwrap();

        let mappings = store
            .canonicalize(vec!["rust".to_string(), "Go".to_string()])
            .await
            .unwrap();
        assert_eq!(mappings[0].candidates.len(), 1);
        assert_eq!(mappings[0].candidates[0].id, "c1");
        assert!(mappings[1].candidates.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_tool_reports_empty_results() {
        let tool = GraphLookupTool::new(Arc::new(MemoryStore::default()));
        let out = tool.invoke(json!({"concept": "Rust"})).await.unwrap();
        assert!(out.contains("Nothing is recorded"));
    }

    #[tokio::test]
    async fn test_lookup_tool_joins_passages() {
        let store = MemoryStore::default();
        store.passages.lock().unwrap().insert(
            "Rust".to_string(),
            vec!["a systems language".to_string(), "has ownership".to_string()],
        );

        let tool = GraphLookupTool::new(Arc::new(store));
        let out = tool.invoke(json!({"concept": "Rust"})).await.unwrap();
        assert_eq!(out, "a systems language\nhas ownership");
    }

    #[tokio::test]
    async fn test_lookup_tool_rejects_missing_argument() {
        let tool = GraphLookupTool::new(Arc::new(MemoryStore::default()));
        assert!(matches!(
            tool.invoke(json!({})).await,
            Err(ToolError::BadArguments(_))
        ));
    }
}
