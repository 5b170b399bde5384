//! Routing after the chat node: tool node when a backend tool was requested, else end.

use crate::graph::END;
use crate::message::{Message, ToolCall};
use crate::state::AgentState;
use crate::tools::BackendTools;

pub const CHAT_NODE: &str = "chat";
pub const TOOL_NODE: &str = "tool";

/// True when any of `tool_calls` names a backend tool.
pub fn route_to_tool_node(tool_calls: &[ToolCall], backend: &BackendTools) -> bool {
    tool_calls.iter().any(|c| backend.is_backend(&c.name))
}

/// Router for the chat node's conditional edge. Looks only at the message the chat node
/// just appended.
pub fn route_after_chat(state: &AgentState, backend: &BackendTools) -> String {
    match state.messages.last() {
        Some(m @ Message::Assistant { .. }) if route_to_tool_node(m.tool_calls(), backend) => {
            TOOL_NODE.to_string()
        }
        _ => END.to_string(),
    }
}
