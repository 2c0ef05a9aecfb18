//! Prometheus metrics for the gateway
//!
//! All metrics register against the default registry on first use and are
//! exposed as text at `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_histogram_vec, CounterVec,
    Encoder, Gauge, Histogram, HistogramVec, TextEncoder,
};

lazy_static! {
    // ─────────────────────────────────────────────────────────────────────────────
    // Conversation Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Chat requests by final outcome.
    ///
    /// Labels:
    /// - outcome: "response", "max_iterations" or "error"
    pub static ref CHAT_REQUESTS: CounterVec = register_counter_vec!(
        "spawngate_chat_requests_total",
        "Chat requests handled by the orchestrator",
        &["outcome"]
    ).expect("failed to register CHAT_REQUESTS metric");

    /// Model calls made per chat request.
    pub static ref AGENT_ITERATIONS: Histogram = register_histogram!(
        "spawngate_agent_iterations",
        "Reasoning iterations per chat request",
        vec![1.0, 2.0, 3.0, 5.0, 8.0, 10.0]
    ).expect("failed to register AGENT_ITERATIONS metric");

    /// Latency of a single reasoning backend call.
    pub static ref LLM_CALL_DURATION: HistogramVec = register_histogram_vec!(
        "spawngate_llm_call_duration_seconds",
        "Reasoning backend call latency",
        &["model"],
        vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).expect("failed to register LLM_CALL_DURATION metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Tool Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Tool dispatches by tool and outcome.
    ///
    /// Labels:
    /// - tool: tool name as requested by the model
    /// - outcome: "success" or "error"
    pub static ref TOOL_CALLS: CounterVec = register_counter_vec!(
        "spawngate_tool_calls_total",
        "Tool dispatches by tool and outcome",
        &["tool", "outcome"]
    ).expect("failed to register TOOL_CALLS metric");

    pub static ref TOOL_DURATION: HistogramVec = register_histogram_vec!(
        "spawngate_tool_duration_seconds",
        "Tool dispatch latency",
        &["tool"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]
    ).expect("failed to register TOOL_DURATION metric");

    /// Sandbox command runs.
    ///
    /// Labels:
    /// - mode: "buffered" or "stream"
    /// - outcome: "success", "failure", "timeout" or "error"
    pub static ref SANDBOX_EXECUTIONS: CounterVec = register_counter_vec!(
        "spawngate_sandbox_executions_total",
        "Shell commands executed through the sandbox endpoints",
        &["mode", "outcome"]
    ).expect("failed to register SANDBOX_EXECUTIONS metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Knowledge & Artifact Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Embedding calls by provider and outcome.
    pub static ref EMBEDDING_REQUESTS: CounterVec = register_counter_vec!(
        "spawngate_embedding_requests_total",
        "Embedding requests by provider and outcome",
        &["provider", "outcome"]
    ).expect("failed to register EMBEDDING_REQUESTS metric");

    pub static ref VECTOR_SEARCH_DURATION: Histogram = register_histogram!(
        "spawngate_vector_search_duration_seconds",
        "Vector similarity search latency including query embedding",
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ).expect("failed to register VECTOR_SEARCH_DURATION metric");

    /// Artifacts built, by resulting status ("complete" or "invalid").
    pub static ref ARTIFACTS_CREATED: CounterVec = register_counter_vec!(
        "spawngate_artifacts_created_total",
        "Artifacts built by status",
        &["status"]
    ).expect("failed to register ARTIFACTS_CREATED metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Transport Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Server-push streams currently open.
    pub static ref STREAMS_IN_FLIGHT: Gauge = register_gauge!(
        "spawngate_streams_in_flight",
        "Server-sent event streams currently open"
    ).expect("failed to register STREAMS_IN_FLIGHT metric");
}

/// Render every registered metric in the Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Decrements `STREAMS_IN_FLIGHT` when dropped
pub struct StreamGuard;

impl StreamGuard {
    pub fn open() -> Self {
        STREAMS_IN_FLIGHT.inc();
        StreamGuard
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        STREAMS_IN_FLIGHT.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_touched_metrics() {
        TOOL_CALLS.with_label_values(&["read_file", "success"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("spawngate_tool_calls_total"));
    }
}
