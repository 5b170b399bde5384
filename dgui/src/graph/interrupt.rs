//! Interrupts: a node pauses the run until the caller supplies a value.
//!
//! A node raises [`GraphInterrupt`] (as `AgentError::Interrupted`); the compiled graph
//! checkpoints the paused continuation and returns the error to the caller, who later
//! calls `CompiledStateGraph::resume` with the answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AgentError;

/// Interrupt value raised during graph execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    /// Payload shown to the caller (e.g. a form envelope).
    pub value: serde_json::Value,
    /// Identifies what is waiting; the tool call id for tool interrupts.
    pub id: Option<String>,
}

impl Interrupt {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, id: None }
    }

    pub fn with_id(value: serde_json::Value, id: String) -> Self {
        Self {
            value,
            id: Some(id),
        }
    }
}

/// Error raised when a graph is interrupted.
#[derive(Debug, Clone, Error)]
#[error("graph interrupted: {}", .0.id.as_deref().unwrap_or("-"))]
pub struct GraphInterrupt(pub Interrupt);

impl From<Interrupt> for GraphInterrupt {
    fn from(interrupt: Interrupt) -> Self {
        GraphInterrupt(interrupt)
    }
}

/// Observer called by the compiled graph whenever a node interrupts, after the
/// checkpoint is saved. Its result does not affect the run.
pub trait InterruptHandler: Send + Sync {
    fn handle_interrupt(&self, interrupt: &Interrupt) -> Result<serde_json::Value, AgentError>;
}

/// Interrupt handler that returns the interrupt value as-is.
#[derive(Debug, Clone)]
pub struct DefaultInterruptHandler;

impl InterruptHandler for DefaultInterruptHandler {
    fn handle_interrupt(&self, interrupt: &Interrupt) -> Result<serde_json::Value, AgentError> {
        Ok(interrupt.value.clone())
    }
}
