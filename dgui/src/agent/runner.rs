//! Form agent: the chat/tool graph plus per-thread conversation handling.
//!
//! [`FormAgent`] owns a compiled `StateGraph<AgentState>`:
//!
//! ```text
//! START -> chat -(backend tool)-> tool -> chat -> ... -(no backend tool)-> END
//! ```
//!
//! Every thread's state is checkpointed, so `run` continues a conversation and `resume`
//! answers a pending `ask_question` form.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::AgentError;
use crate::graph::{
    CompilationError, CompiledStateGraph, GraphInterrupt, Interrupt, InterruptHandler,
    LoggingNodeMiddleware, StateGraph, START,
};
use crate::llm::LlmClient;
use crate::memory::{Checkpointer, MemorySaver, RunnableConfig};
use crate::message::{Message, ToolCall};
use crate::state::AgentState;
use crate::tools::{BackendTools, FormRequest, ToolSpec};

use super::chat_node::ChatNode;
use super::phase::{AgentPhase, PhaseEvent, PhaseRecorder};
use super::route::{route_after_chat, CHAT_NODE, TOOL_NODE};
use super::tool_node::ToolNode;

/// Content stored for a caller tool call that was never answered when the next user
/// message arrives.
pub const MISSING_TOOL_RESULT: &str = "No result was provided for this tool call.";

/// Result of one `run` / `resume` / `submit_tool_result`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The graph reached END.
    Completed {
        /// Text of the final assistant message (may be empty when it only holds a tool call).
        reply: Option<String>,
        state: AgentState,
        trace: Vec<AgentPhase>,
        /// Set when the turn ended on a call to a caller tool; answer it with
        /// [`FormAgent::submit_tool_result`].
        external_call: Option<ToolCall>,
    },
    /// The run is waiting for the user; answer with [`FormAgent::resume`].
    Suspended {
        interrupt: Interrupt,
        /// Parsed envelope when the interrupt carries a form request.
        form: Option<FormRequest>,
        trace: Vec<AgentPhase>,
    },
}

impl RunOutcome {
    pub fn trace(&self) -> &[AgentPhase] {
        match self {
            RunOutcome::Completed { trace, .. } | RunOutcome::Suspended { trace, .. } => trace,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, RunOutcome::Suspended { .. })
    }
}

/// Form-gathering chat agent.
///
/// **Interaction**: Built by [`FormAgentBuilder`] or [`build_form_agent`]; the CLI
/// drives it one turn at a time.
pub struct FormAgent {
    graph: CompiledStateGraph<AgentState>,
    recorder: Arc<PhaseRecorder>,
    backend: Arc<BackendTools>,
    caller_tools: Vec<ToolSpec>,
}

impl FormAgent {
    /// Starts a new turn on `thread_id` with the user's message.
    ///
    /// Fails with `ThreadSuspended` while the thread waits for a resume value.
    pub async fn run(&self, thread_id: &str, user_text: &str) -> Result<RunOutcome, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        let mut state = self.load_idle_state(thread_id, &config).await?;
        close_unanswered_calls(&mut state);
        state.messages.push(Message::user(user_text));
        tracing::info!(thread_id, history = state.messages.len(), "agent turn");
        self.invoke(thread_id, state, config).await
    }

    /// Answers the pending form of `thread_id` with `value` and continues the run.
    pub async fn resume(&self, thread_id: &str, value: Value) -> Result<RunOutcome, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        let call_id = self
            .graph
            .get_state(&config)
            .await?
            .and_then(|cp| cp.pending)
            .map(|p| p.interrupt.id.unwrap_or_default())
            .ok_or_else(|| AgentError::NoPendingInterrupt(thread_id.to_string()))?;
        tracing::info!(thread_id, call_id = %call_id, "resuming suspended run");
        self.recorder.begin(thread_id, AgentPhase::Suspended { call_id });
        self.recorder.apply(thread_id, PhaseEvent::ResumeReceived)?;
        let result = self.graph.resume(value, config).await;
        self.finish(thread_id, result)
    }

    /// Stores `content` as the result of the caller tool call `call_id` and lets the
    /// model continue.
    pub async fn submit_tool_result(
        &self,
        thread_id: &str,
        call_id: &str,
        content: &str,
    ) -> Result<RunOutcome, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        let mut state = self.load_idle_state(thread_id, &config).await?;
        if !state.unanswered_tool_calls().iter().any(|c| c.id == call_id) {
            return Err(AgentError::ExecutionFailed(format!(
                "no unanswered tool call {} on thread {}",
                call_id, thread_id
            )));
        }
        state.messages.push(Message::tool(call_id, content));
        self.invoke(thread_id, state, config).await
    }

    /// Latest checkpointed state of the thread.
    pub async fn state(&self, thread_id: &str) -> Result<Option<AgentState>, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        Ok(self.graph.get_state(&config).await?.map(|cp| cp.state))
    }

    /// Where the thread rests between runs: `Suspended` on a pending form, else
    /// `Terminated`; `None` for an unknown thread.
    pub async fn phase(&self, thread_id: &str) -> Result<Option<AgentPhase>, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        Ok(self.graph.get_state(&config).await?.map(|cp| match cp.pending {
            Some(p) => AgentPhase::Suspended {
                call_id: p.interrupt.id.unwrap_or_default(),
            },
            None => AgentPhase::Terminated,
        }))
    }

    /// The form the thread is waiting on, if any.
    pub async fn pending_form(&self, thread_id: &str) -> Result<Option<FormRequest>, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        Ok(self
            .graph
            .get_state(&config)
            .await?
            .and_then(|cp| cp.pending)
            .and_then(|p| FormRequest::from_value(&p.interrupt.value)))
    }

    /// The suspension a thread is resting in, rebuilt from its checkpoint; `None` when
    /// the thread is idle or unknown. Lets a front end show the form again after a
    /// failed `resume` left the run suspended.
    pub async fn pending_outcome(
        &self,
        thread_id: &str,
    ) -> Result<Option<RunOutcome>, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        let pending = match self.graph.get_state(&config).await?.and_then(|cp| cp.pending) {
            Some(p) => p,
            None => return Ok(None),
        };
        let interrupt = pending.interrupt;
        let call_id = interrupt.id.clone().unwrap_or_default();
        let form = FormRequest::from_value(&interrupt.value);
        Ok(Some(RunOutcome::Suspended {
            interrupt,
            form,
            trace: vec![AgentPhase::Suspended { call_id }],
        }))
    }

    /// Tool definitions bound to the model on a turn without caller overrides.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.backend.merge_with(&self.caller_tools)
    }

    async fn load_idle_state(
        &self,
        thread_id: &str,
        config: &RunnableConfig,
    ) -> Result<AgentState, AgentError> {
        let mut state = match self.graph.get_state(config).await? {
            Some(cp) if cp.is_interrupted() => {
                return Err(AgentError::ThreadSuspended(thread_id.to_string()))
            }
            Some(cp) => cp.state,
            None => AgentState::default(),
        };
        state.tools = self.caller_tools.clone();
        Ok(state)
    }

    async fn invoke(
        &self,
        thread_id: &str,
        state: AgentState,
        config: RunnableConfig,
    ) -> Result<RunOutcome, AgentError> {
        self.recorder.begin(thread_id, AgentPhase::Chat);
        let result = self.graph.invoke(state, Some(config)).await;
        self.finish(thread_id, result)
    }

    fn finish(
        &self,
        thread_id: &str,
        result: Result<AgentState, AgentError>,
    ) -> Result<RunOutcome, AgentError> {
        let trace = self.recorder.take(thread_id);
        match result {
            Ok(state) => {
                let external_call = state
                    .unanswered_tool_calls()
                    .into_iter()
                    .find(|c| !self.backend.is_backend(&c.name))
                    .cloned();
                let reply = state.last_assistant_reply().map(str::to_string);
                tracing::info!(
                    thread_id,
                    steps = trace.len(),
                    external = external_call.is_some(),
                    "agent turn complete"
                );
                Ok(RunOutcome::Completed {
                    reply,
                    state,
                    trace,
                    external_call,
                })
            }
            Err(AgentError::Interrupted(GraphInterrupt(interrupt))) => {
                let form = FormRequest::from_value(&interrupt.value);
                Ok(RunOutcome::Suspended {
                    interrupt,
                    form,
                    trace,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Pairs every unanswered tool call of the last assistant message with a placeholder
/// result, so the history sent to the model stays well formed.
fn close_unanswered_calls(state: &mut AgentState) {
    let dangling: Vec<String> = state
        .unanswered_tool_calls()
        .into_iter()
        .map(|c| c.id.clone())
        .collect();
    for call_id in dangling {
        tracing::warn!(
            call_id = %call_id,
            "tool call left unanswered; closing it before the new turn"
        );
        state.messages.push(Message::tool(call_id, MISSING_TOOL_RESULT));
    }
}

/// Builder for [`FormAgent`].
pub struct FormAgentBuilder {
    llm: Arc<dyn LlmClient>,
    backend: BackendTools,
    caller_tools: Vec<ToolSpec>,
    checkpointer: Option<Arc<dyn Checkpointer<AgentState>>>,
    interrupt_handler: Option<Arc<dyn InterruptHandler>>,
    node_logging: bool,
}

impl FormAgentBuilder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            backend: BackendTools::standard(),
            caller_tools: Vec::new(),
            checkpointer: None,
            interrupt_handler: None,
            node_logging: false,
        }
    }

    pub fn backend_tools(mut self, backend: BackendTools) -> Self {
        self.backend = backend;
        self
    }

    /// Caller (front-end) tools bound on every turn.
    pub fn caller_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.caller_tools = tools;
        self
    }

    /// Defaults to an in-memory [`MemorySaver`].
    pub fn checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<AgentState>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn interrupt_handler(mut self, handler: Arc<dyn InterruptHandler>) -> Self {
        self.interrupt_handler = Some(handler);
        self
    }

    /// Adds [`LoggingNodeMiddleware`] around every node.
    pub fn node_logging(mut self, enabled: bool) -> Self {
        self.node_logging = enabled;
        self
    }

    pub fn build(self) -> Result<FormAgent, CompilationError> {
        let backend = Arc::new(self.backend);
        let recorder = Arc::new(PhaseRecorder::new(backend.clone()));

        let mut graph = StateGraph::<AgentState>::new().with_middleware(recorder.clone());
        if self.node_logging {
            graph = graph.with_middleware(Arc::new(LoggingNodeMiddleware::default()));
        }
        if let Some(handler) = self.interrupt_handler {
            graph = graph.with_interrupt_handler(handler);
        }
        graph
            .add_node(CHAT_NODE, Arc::new(ChatNode::new(self.llm, backend.clone())))
            .add_node(TOOL_NODE, Arc::new(ToolNode::new(backend.clone())))
            .add_edge(START, CHAT_NODE)
            .add_edge(TOOL_NODE, CHAT_NODE);
        let router_backend = backend.clone();
        graph.add_conditional_edges(
            CHAT_NODE,
            Arc::new(move |s: &AgentState| route_after_chat(s, &router_backend)),
            None,
        );

        let checkpointer: Arc<dyn Checkpointer<AgentState>> = match self.checkpointer {
            Some(cp) => cp,
            None => Arc::new(MemorySaver::new()),
        };
        let graph = graph.compile_with_checkpointer(checkpointer)?;

        Ok(FormAgent {
            graph,
            recorder,
            backend,
            caller_tools: self.caller_tools,
        })
    }
}

/// Agent with the standard backend tools, an in-memory checkpointer and `caller_tools`.
pub fn build_form_agent(
    llm: Arc<dyn LlmClient>,
    caller_tools: Vec<ToolSpec>,
) -> Result<FormAgent, CompilationError> {
    FormAgentBuilder::new(llm).caller_tools(caller_tools).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, MockLlm};
    use crate::tools::generate_json_schema_spec;
    use serde_json::json;

    fn ask_call(id: &str) -> ToolCall {
        let args = json!({
            "question": json!({
                "type": "object",
                "properties": {"name": {"type": "string"}}
            })
            .to_string(),
            "uiSchema": "{}",
        });
        ToolCall::new(id, "ask_question", args.to_string())
    }

    #[tokio::test]
    async fn unknown_thread_has_no_state_or_phase() {
        let agent = build_form_agent(Arc::new(MockLlm::with_no_tool_calls("hi")), vec![]).unwrap();
        assert!(agent.state("nope").await.unwrap().is_none());
        assert!(agent.phase("nope").await.unwrap().is_none());
        assert!(agent.pending_form("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resume_without_pending_form_fails() {
        let agent = build_form_agent(Arc::new(MockLlm::with_no_tool_calls("hi")), vec![]).unwrap();
        agent.run("t", "hello").await.unwrap();
        assert!(matches!(
            agent.resume("t", json!("x")).await,
            Err(AgentError::NoPendingInterrupt(t)) if t == "t"
        ));
    }

    /// **Scenario**: the model fails after the form is answered; the thread stays
    /// suspended on the same form and a second answer completes the turn.
    #[tokio::test]
    async fn failed_resume_keeps_form_pending_and_can_be_retried() {
        let llm = Arc::new(
            MockLlm::new(vec![LlmResponse::tool_call(ask_call("c1"))]).then_fail("upstream 503"),
        );
        let agent = build_form_agent(llm.clone(), vec![]).unwrap();
        assert!(agent.pending_outcome("t").await.unwrap().is_none());
        agent.run("t", "hi").await.unwrap();

        let err = agent.resume("t", json!({"name": "A"})).await.unwrap_err();
        assert!(err.to_string().contains("upstream 503"));

        match agent.pending_outcome("t").await.unwrap() {
            Some(RunOutcome::Suspended { interrupt, form, trace }) => {
                assert_eq!(interrupt.id.as_deref(), Some("c1"));
                assert!(form.is_some());
                assert_eq!(trace, vec![AgentPhase::Suspended { call_id: "c1".into() }]);
            }
            other => panic!("expected pending suspension, got {:?}", other),
        }

        let done = agent.resume("t", json!({"name": "A"})).await.unwrap();
        assert!(!done.is_suspended());
        assert!(agent.pending_outcome("t").await.unwrap().is_none());
        let state = agent.state("t").await.unwrap().unwrap();
        let results = state
            .messages
            .iter()
            .filter(|m| matches!(m, Message::Tool { .. }))
            .count();
        assert_eq!(results, 1);
        assert_eq!(llm.call_count(), 3);
    }

    /// **Scenario**: suspended thread reports its phase and form, and rejects new turns.
    #[tokio::test]
    async fn suspended_thread_state() {
        let llm = MockLlm::new(vec![LlmResponse::tool_call(ask_call("c1"))]);
        let agent = build_form_agent(Arc::new(llm), vec![]).unwrap();
        let outcome = agent.run("t", "book a flight").await.unwrap();
        assert!(outcome.is_suspended());

        assert_eq!(
            agent.phase("t").await.unwrap(),
            Some(AgentPhase::Suspended { call_id: "c1".into() })
        );
        let form = agent.pending_form("t").await.unwrap().unwrap();
        assert_eq!(form.schema["properties"]["name"]["type"], "string");
        assert!(matches!(
            agent.run("t", "again").await,
            Err(AgentError::ThreadSuspended(_))
        ));
    }

    /// **Scenario**: a caller tool call left unanswered is closed before the next user turn.
    #[tokio::test]
    async fn dangling_external_call_is_closed_on_next_turn() {
        let llm = Arc::new(MockLlm::new(vec![
            LlmResponse::tool_call(ToolCall::new("g1", "generateJsonSchema", "{}")),
            LlmResponse::text("fine"),
        ]));
        let agent = build_form_agent(llm.clone(), vec![generate_json_schema_spec()]).unwrap();
        match agent.run("t", "build me a form").await.unwrap() {
            RunOutcome::Completed { external_call, .. } => {
                assert_eq!(external_call.map(|c| c.id), Some("g1".to_string()));
            }
            other => panic!("expected completion, got {:?}", other),
        }
        agent.run("t", "never mind").await.unwrap();
        let requests = llm.requests();
        let sent = &requests[1].messages;
        assert_eq!(sent[sent.len() - 2], Message::tool("g1", MISSING_TOOL_RESULT));
        assert_eq!(sent[sent.len() - 1], Message::user("never mind"));
    }

    #[tokio::test]
    async fn submit_tool_result_answers_external_call() {
        let llm = Arc::new(MockLlm::new(vec![
            LlmResponse::tool_call(ToolCall::new("g1", "generateJsonSchema", "{}")),
            LlmResponse::text("form rendered"),
        ]));
        let agent = build_form_agent(llm.clone(), vec![generate_json_schema_spec()]).unwrap();
        agent.run("t", "build me a form").await.unwrap();

        assert!(agent.submit_tool_result("t", "nope", "x").await.is_err());
        let outcome = agent.submit_tool_result("t", "g1", "done").await.unwrap();
        match outcome {
            RunOutcome::Completed { reply, external_call, .. } => {
                assert_eq!(reply.as_deref(), Some("form rendered"));
                assert!(external_call.is_none());
            }
            other => panic!("expected completion, got {:?}", other),
        }
        let requests = llm.requests();
        let sent = &requests[1].messages;
        assert_eq!(sent.last(), Some(&Message::tool("g1", "done")));
    }

    #[test]
    fn tool_specs_lists_caller_then_backend() {
        let agent = build_form_agent(
            Arc::new(MockLlm::with_no_tool_calls("hi")),
            vec![generate_json_schema_spec()],
        )
        .unwrap();
        let names: Vec<String> = agent.tool_specs().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["generateJsonSchema", "get_weather", "ask_question"]);
    }
}
