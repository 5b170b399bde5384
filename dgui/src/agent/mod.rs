//! The form agent: chat and tool nodes wired into a two-node graph.
//!
//! - [`ChatNode`]: system prompt + history + tools → model → assistant message.
//! - [`ToolNode`]: runs `get_weather` / `ask_question`; `ask_question` interrupts.
//! - [`route_after_chat`]: tool node for backend tool calls, END otherwise.
//! - [`FormAgent`]: per-thread `run` / `resume` over the compiled graph.

mod chat_node;
mod phase;
mod prompt;
mod route;
mod runner;
mod tool_node;

pub use chat_node::ChatNode;
pub use phase::{AgentPhase, PhaseEvent, PhaseRecorder};
pub use prompt::SYSTEM_PROMPT;
pub use route::{route_after_chat, route_to_tool_node, CHAT_NODE, TOOL_NODE};
pub use runner::{build_form_agent, FormAgent, FormAgentBuilder, RunOutcome, MISSING_TOOL_RESULT};
pub use tool_node::ToolNode;
