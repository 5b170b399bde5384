//! Conversation phases of one agent run and the transitions between them.
//!
//! ```text
//! Chat --BackendToolRequested--> Tool --ToolsResolved--> Chat
//! Chat --NoBackendCall--> Terminated
//! Tool --AwaitingInput--> Suspended(call id) --ResumeReceived--> Tool
//! ```
//!
//! [`PhaseRecorder`] is a node middleware that applies these transitions as the graph
//! runs, so every run yields a phase trace.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::graph::{GraphInterrupt, Next, NodeInner, NodeMiddleware, RunContext};
use crate::state::AgentState;
use crate::tools::BackendTools;

use super::route::{route_after_chat, CHAT_NODE, TOOL_NODE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AgentPhase {
    Chat,
    Tool,
    /// Waiting for the resume value of the `ask_question` call `call_id`.
    Suspended { call_id: String },
    Terminated,
}

impl AgentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentPhase::Terminated)
    }

    /// Next phase for `event`, or `InvalidTransition` when the phase has no such edge.
    pub fn transition(&self, event: &PhaseEvent) -> Result<AgentPhase, AgentError> {
        match (self, event) {
            (AgentPhase::Chat, PhaseEvent::BackendToolRequested) => Ok(AgentPhase::Tool),
            (AgentPhase::Chat, PhaseEvent::NoBackendCall) => Ok(AgentPhase::Terminated),
            (AgentPhase::Tool, PhaseEvent::AwaitingInput { call_id }) => Ok(AgentPhase::Suspended {
                call_id: call_id.clone(),
            }),
            (AgentPhase::Tool, PhaseEvent::ToolsResolved) => Ok(AgentPhase::Chat),
            (AgentPhase::Suspended { .. }, PhaseEvent::ResumeReceived) => Ok(AgentPhase::Tool),
            (from, event) => Err(AgentError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            }),
        }
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentPhase::Chat => write!(f, "chat"),
            AgentPhase::Tool => write!(f, "tool"),
            AgentPhase::Suspended { call_id } => write!(f, "suspended({})", call_id),
            AgentPhase::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    BackendToolRequested,
    NoBackendCall,
    AwaitingInput { call_id: String },
    ResumeReceived,
    ToolsResolved,
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseEvent::BackendToolRequested => write!(f, "backend_tool_requested"),
            PhaseEvent::NoBackendCall => write!(f, "no_backend_call"),
            PhaseEvent::AwaitingInput { call_id } => write!(f, "awaiting_input({})", call_id),
            PhaseEvent::ResumeReceived => write!(f, "resume_received"),
            PhaseEvent::ToolsResolved => write!(f, "tools_resolved"),
        }
    }
}

/// Records the phase trace of each thread's current run.
///
/// **Interaction**: Installed as the outermost `NodeMiddleware<AgentState>` by
/// `FormAgentBuilder`; `FormAgent` calls `begin` before a run and `take` after it.
pub struct PhaseRecorder {
    backend: Arc<BackendTools>,
    traces: Mutex<HashMap<String, Vec<AgentPhase>>>,
}

impl PhaseRecorder {
    pub fn new(backend: Arc<BackendTools>) -> Self {
        Self {
            backend,
            traces: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a fresh trace for `thread_id` at `phase`.
    pub fn begin(&self, thread_id: &str, phase: AgentPhase) {
        self.lock().insert(thread_id.to_string(), vec![phase]);
    }

    /// Applies `event` to the thread's current phase and appends the result.
    pub fn apply(&self, thread_id: &str, event: PhaseEvent) -> Result<AgentPhase, AgentError> {
        let mut traces = self.lock();
        let trace = traces.entry(thread_id.to_string()).or_default();
        let current = trace.last().cloned().unwrap_or(AgentPhase::Chat);
        let next = current.transition(&event)?;
        tracing::trace!(thread_id, from = %current, to = %next, %event, "phase transition");
        if trace.is_empty() {
            trace.push(current);
        }
        trace.push(next.clone());
        Ok(next)
    }

    /// Current phase of the thread's run, if one was started.
    pub fn current(&self, thread_id: &str) -> Option<AgentPhase> {
        self.lock().get(thread_id).and_then(|t| t.last().cloned())
    }

    /// Removes and returns the thread's trace.
    pub fn take(&self, thread_id: &str) -> Vec<AgentPhase> {
        self.lock().remove(thread_id).unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<AgentPhase>>> {
        self.traces.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs without a `begin` start at the phase of the node being entered.
    fn ensure_started(&self, thread_id: &str, node_id: &str) {
        let mut traces = self.lock();
        let trace = traces.entry(thread_id.to_string()).or_default();
        if trace.is_empty() {
            trace.push(if node_id == TOOL_NODE {
                AgentPhase::Tool
            } else {
                AgentPhase::Chat
            });
        }
    }
}

#[async_trait]
impl NodeMiddleware<AgentState> for PhaseRecorder {
    async fn around_run(
        &self,
        node_id: &str,
        state: AgentState,
        ctx: &RunContext,
        inner: NodeInner<AgentState>,
    ) -> Result<(AgentState, Next), AgentError> {
        let Some(thread_id) = ctx.thread_id().map(str::to_string) else {
            return inner(state).await;
        };
        self.ensure_started(&thread_id, node_id);
        let result = inner(state).await;
        let event = match (node_id, &result) {
            (CHAT_NODE, Ok((state, _))) => {
                if route_after_chat(state, &self.backend) == TOOL_NODE {
                    Some(PhaseEvent::BackendToolRequested)
                } else {
                    Some(PhaseEvent::NoBackendCall)
                }
            }
            (TOOL_NODE, Ok(_)) => Some(PhaseEvent::ToolsResolved),
            (TOOL_NODE, Err(AgentError::Interrupted(GraphInterrupt(i)))) => {
                Some(PhaseEvent::AwaitingInput {
                    call_id: i.id.clone().unwrap_or_default(),
                })
            }
            _ => None,
        };
        if let Some(event) = event {
            self.apply(&thread_id, event)?;
        }
        result
    }
}
