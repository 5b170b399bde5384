//! Agent execution error types.
//!
//! Returned by graph nodes, the compiled graph and [`FormAgent`](crate::FormAgent).

use thiserror::Error;

use crate::graph::GraphInterrupt;
use crate::memory::CheckpointError;

/// Agent execution error.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (model call failed, tool arguments unusable).
    /// Fatal for the turn; nothing retries it.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A node paused the run pending external input (form interrupt).
    ///
    /// The compiled graph checkpoints the paused continuation before returning this;
    /// resume with [`CompiledStateGraph::resume`](crate::graph::CompiledStateGraph::resume).
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),

    /// `resume` was called for a thread that is not suspended.
    #[error("no pending interrupt for thread {0}")]
    NoPendingInterrupt(String),

    /// A new user turn was started on a thread still waiting for a resume value.
    #[error("thread {0} is suspended; resume it before sending a new message")]
    ThreadSuspended(String),

    /// The conversation state machine was asked to take a transition it does not have.
    #[error("invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}
