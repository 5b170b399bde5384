//! Structured logging for graph execution events.

use std::fmt::Debug;

pub fn log_node_start(node_id: &str) {
    tracing::debug!(node_id = node_id, "Starting node execution");
}

/// Logs the input state of a node at trace level.
pub fn log_node_state<S: Debug>(node_id: &str, state: &S) {
    tracing::trace!(node_id = node_id, state = ?state, "Node execution: state");
}

pub fn log_node_complete(node_id: &str, next: &crate::graph::Next) {
    tracing::debug!(node_id = node_id, ?next, "Node execution complete");
}

pub fn log_graph_start(start_node: &str, resumed: bool) {
    tracing::info!(start_node = start_node, resumed, "Starting graph execution");
}

pub fn log_graph_complete(steps: i64) {
    tracing::info!(steps, "Graph execution complete");
}

/// Interrupts are expected control flow and logged at info; everything else at error.
pub fn log_graph_error(error: &crate::error::AgentError) {
    match error {
        crate::error::AgentError::Interrupted(i) => {
            tracing::info!(interrupt_id = ?i.0.id, "Graph execution interrupted")
        }
        other => tracing::error!(error = %other, "Graph execution error"),
    }
}
