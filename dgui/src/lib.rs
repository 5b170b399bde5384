//! # dgui
//!
//! A form-gathering chat agent: a language model bound to two backend tools
//! (`get_weather` and `ask_question`), run on a two-node state graph.
//!
//! ```text
//! START -> chat --(backend tool call)--> tool --> chat --> ... --(no backend call)--> END
//! ```
//!
//! `ask_question` needs the user: the tool node interrupts with a `dgui_form` envelope
//! (JSON Schema + uiSchema), the run is checkpointed, and [`FormAgent::resume`] feeds the
//! user's answer back in as the tool result.
//!
//! ## Main modules
//!
//! - [`agent`]: [`ChatNode`], [`ToolNode`], [`route_after_chat`], [`AgentPhase`],
//!   [`FormAgent`], [`FormAgentBuilder`], [`build_form_agent`].
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`], [`RunContext`],
//!   [`NodeMiddleware`], interrupts.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`].
//! - [`memory`]: [`Checkpointer`], [`MemorySaver`], [`RunnableConfig`].
//! - [`tools`]: [`ToolSpec`], [`BackendTool`], [`BackendTools`], [`FormRequest`].
//! - [`state`] / [`message`]: [`AgentState`], [`Message`], [`ToolCall`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dgui::{build_form_agent, generate_json_schema_spec, MockLlm, RunOutcome};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = Arc::new(MockLlm::with_no_tool_calls("Hello!"));
//! let agent = build_form_agent(llm, vec![generate_json_schema_spec()])?;
//! match agent.run("thread-1", "hi").await? {
//!     RunOutcome::Completed { reply, .. } => println!("{}", reply.unwrap_or_default()),
//!     RunOutcome::Suspended { form, .. } => println!("form: {:?}", form),
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod state;
pub mod tools;

pub use agent::{
    build_form_agent, route_after_chat, route_to_tool_node, AgentPhase, ChatNode, FormAgent,
    FormAgentBuilder, PhaseEvent, PhaseRecorder, RunOutcome, ToolNode, CHAT_NODE,
    MISSING_TOOL_RESULT, SYSTEM_PROMPT, TOOL_NODE,
};
pub use error::AgentError;
pub use graph::{
    CompilationError, CompiledStateGraph, DefaultInterruptHandler, GraphInterrupt, Interrupt,
    InterruptHandler, LoggingNodeMiddleware, Next, Node, NodeMiddleware, ResumeValue, RunContext,
    StateGraph, END, START,
};
pub use llm::{ChatOpenAI, LlmClient, LlmRequest, LlmResponse, LlmUsage, MockLlm, ToolChoiceMode};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointSource, Checkpointer, MemorySaver, PendingInterrupt,
    RunnableConfig,
};
pub use message::{Message, ToolCall};
pub use state::AgentState;
pub use tools::{
    ask_question, generate_json_schema_spec, get_weather, parse_arguments, BackendTool,
    BackendTools, FormRequest, ToolError, ToolKind, ToolOutcome, ToolSpec, FORM_REQUEST_TYPE,
    TOOL_ASK_QUESTION, TOOL_GENERATE_JSON_SCHEMA, TOOL_GET_WEATHER,
};
