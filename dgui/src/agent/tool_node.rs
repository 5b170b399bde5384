//! Tool node: run the backend tool calls of the last assistant message.
//!
//! Each unanswered backend call is executed and its result appended as a tool message.
//! `ask_question` cannot finish without the user: the node raises an interrupt carrying
//! the form envelope, with the tool call id as interrupt id. When the graph is resumed,
//! the node runs again on the same state, skips calls that already have results, and
//! the resume value addressed to the pending call becomes its result.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{GraphInterrupt, Interrupt, Next, Node, RunContext};
use crate::message::Message;
use crate::state::AgentState;
use crate::tools::{parse_arguments, BackendTools, ToolKind, ToolOutcome};

use super::route::TOOL_NODE;

/// Tool node.
///
/// **Interaction**: Implements `Node<AgentState>`; shares [`BackendTools`] with the chat node.
pub struct ToolNode {
    backend: Arc<BackendTools>,
}

impl ToolNode {
    pub fn new(backend: Arc<BackendTools>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Node<AgentState> for ToolNode {
    fn id(&self) -> &str {
        TOOL_NODE
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        self.run_with_context(state, &RunContext::default()).await
    }

    async fn run_with_context(
        &self,
        mut state: AgentState,
        ctx: &RunContext,
    ) -> Result<(AgentState, Next), AgentError> {
        let calls = state.last_tool_calls().to_vec();
        for call in calls {
            if state.has_tool_result(&call.id) {
                tracing::debug!(call_id = %call.id, "tool call already answered; skipping");
                continue;
            }
            let tool = match self.backend.classify(&call.name) {
                ToolKind::Backend(tool) => tool,
                ToolKind::External(name) => {
                    tracing::debug!(tool = %name, "not a backend tool; left for the caller");
                    continue;
                }
            };
            let args = parse_arguments(&call.name, &call.arguments)
                .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
            let outcome = tool
                .call(&args, ctx.resume_for(&call.id))
                .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
            match outcome {
                ToolOutcome::Completed(content) => {
                    tracing::debug!(tool = tool.name(), call_id = %call.id, "tool completed");
                    state.messages.push(Message::tool(call.id, content));
                }
                ToolOutcome::Pending(payload) => {
                    tracing::info!(
                        tool = tool.name(),
                        call_id = %call.id,
                        "tool awaiting user input"
                    );
                    return Err(GraphInterrupt(Interrupt::with_id(payload, call.id)).into());
                }
            }
        }
        Ok((state, Next::Continue))
    }
}
