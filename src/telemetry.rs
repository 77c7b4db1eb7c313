//! Invocation tracing
//!
//! A [`Telemetry`] sink receives one [`InvocationTrace`] per agent invocation,
//! success or failure. Sinks are attached per bound agent and must tolerate
//! concurrent recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one invocation looked like from the outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationTrace {
    pub agent: String,
    pub platform: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Model turns taken. Zero when the invocation failed before completing.
    pub turns: usize,
    pub tool_calls: usize,
    /// Rendered error, when the invocation failed.
    pub error: Option<String>,
}

/// Trait for recording invocation traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, trace: InvocationTrace);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
pub struct MemoryTelemetry {
    traces: std::sync::Mutex<Vec<InvocationTrace>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self {
            traces: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn get_traces(&self) -> Vec<InvocationTrace> {
        self.traces.lock().unwrap().clone()
    }
}

impl Default for MemoryTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, trace: InvocationTrace) {
        self.traces.lock().unwrap().push(trace);
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(agent: &str) -> InvocationTrace {
        let now = Utc::now();
        InvocationTrace {
            agent: agent.to_string(),
            platform: "openai".to_string(),
            model: "gpt-4-turbo".to_string(),
            started_at: now,
            finished_at: now,
            turns: 1,
            tool_calls: 0,
            error: None,
        }
    }

    #[test]
    fn test_memory_telemetry_collects_in_order() {
        let sink = MemoryTelemetry::new();
        sink.record(trace("a"));
        sink.record(trace("b"));

        let traces = sink.get_traces();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].agent, "a");
        assert_eq!(traces[1].agent, "b");
    }

    #[test]
    fn test_trace_round_trips_through_serde() {
        let original = trace("a");
        let json = serde_json::to_string(&original).unwrap();
        let back: InvocationTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agent, original.agent);
        assert_eq!(back.started_at, original.started_at);
    }
}
