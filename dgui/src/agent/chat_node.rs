//! Chat node: prepend the system prompt, bind tools, call the LLM, append its reply.
//!
//! Tools bound on every call are the caller tools from [`AgentState::tools`] followed by
//! the backend tools. Only the first tool call of a response is kept; routing to the tool
//! node is decided afterwards by [`route_after_chat`](super::route_after_chat).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::AgentState;
use crate::tools::{BackendTools, ToolKind};

use super::prompt::SYSTEM_PROMPT;
use super::route::CHAT_NODE;

/// Chat node: one model turn.
///
/// **Interaction**: Implements `Node<AgentState>`; holds `Arc<dyn LlmClient>` and the
/// agent's shared [`BackendTools`].
pub struct ChatNode {
    llm: Arc<dyn LlmClient>,
    backend: Arc<BackendTools>,
}

impl ChatNode {
    pub fn new(llm: Arc<dyn LlmClient>, backend: Arc<BackendTools>) -> Self {
        Self { llm, backend }
    }
}

#[async_trait]
impl Node<AgentState> for ChatNode {
    fn id(&self) -> &str {
        CHAT_NODE
    }

    async fn run(&self, mut state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let tools = self.backend.merge_with(&state.tools);
        let mut request = Vec::with_capacity(state.messages.len() + 1);
        request.push(Message::system(SYSTEM_PROMPT));
        request.extend(state.messages.iter().cloned());

        let response = self.llm.invoke(&request, &tools).await?;

        let mut calls = response.tool_calls;
        if calls.len() > 1 {
            tracing::warn!(
                kept = %calls[0].name,
                dropped = calls.len() - 1,
                "model returned several tool calls; acting on the first only"
            );
            calls.truncate(1);
        }
        for call in calls.iter_mut() {
            if call.id.is_empty() {
                call.id = format!("call-{}", uuid::Uuid::new_v4());
            }
            match self.backend.classify(&call.name) {
                ToolKind::Backend(tool) => {
                    tracing::debug!(
                        tool = tool.name(),
                        call_id = %call.id,
                        "backend tool requested"
                    )
                }
                ToolKind::External(name) => {
                    tracing::debug!(
                        tool = %name,
                        call_id = %call.id,
                        "non-backend tool requested; ending turn"
                    )
                }
            }
        }

        state.add_usage(response.usage.as_ref());
        state
            .messages
            .push(Message::assistant_with_tool_calls(response.content, calls));
        Ok((state, Next::Continue))
    }
}
