//! Conversation state flowing through the chat/tool graph.
//!
//! [`AgentState`] holds the ordered message history plus the caller-supplied tool
//! definitions. Nodes take it by value and hand back the extended state; the
//! checkpointer stores it between suspend and resume.
//!
//! # Example
//!
//! ```rust
//! use dgui::{AgentState, Message};
//!
//! let mut state = AgentState::default();
//! state.messages.push(Message::user("Book a flight for me next week."));
//! ```

use serde::{Deserialize, Serialize};

use crate::llm::LlmUsage;
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    /// Conversation history (User, Assistant, Tool). The system prompt is not stored here.
    pub messages: Vec<Message>,
    /// Tool definitions supplied by the caller (front end); exposed to the model but never
    /// executed locally.
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    /// Token usage summed over every model call of the conversation, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_usage: Option<LlmUsage>,
}

impl AgentState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: vec![],
            total_usage: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Content of the last assistant message, if any.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Tool calls of the most recent assistant message.
    pub fn last_tool_calls(&self) -> &[ToolCall] {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::Assistant { .. }))
            .map(Message::tool_calls)
            .unwrap_or(&[])
    }

    /// Adds one call's usage to the running total.
    pub fn add_usage(&mut self, usage: Option<&LlmUsage>) {
        let Some(u) = usage else { return };
        let total = self.total_usage.get_or_insert_with(LlmUsage::default);
        total.prompt_tokens += u.prompt_tokens;
        total.completion_tokens += u.completion_tokens;
        total.total_tokens += u.total_tokens;
    }

    /// Tool calls of the last assistant message that have no result yet.
    pub fn unanswered_tool_calls(&self) -> Vec<&ToolCall> {
        self.last_tool_calls()
            .iter()
            .filter(|c| !self.has_tool_result(&c.id))
            .collect()
    }

    /// Whether a tool result for `call_id` is already in the history.
    pub fn has_tool_result(&self, call_id: &str) -> bool {
        self.messages
            .iter()
            .any(|m| matches!(m, Message::Tool { tool_call_id, .. } if tool_call_id == call_id))
    }
}
