//! Compiled state graph: immutable, supports invoke and resume.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. When a checkpointer is
//! set and the config has a `thread_id`, the graph saves a checkpoint when the run ends
//! and when a node interrupts. An interrupt checkpoint holds the state the interrupted
//! node received plus a [`PendingInterrupt`]; [`CompiledStateGraph::resume`] re-enters
//! that node with the caller's answer in [`RunContext::resume`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::error::AgentError;
use crate::memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointSource, Checkpointer,
    PendingInterrupt, RunnableConfig,
};

use super::interrupt::{GraphInterrupt, InterruptHandler};
use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_node_state,
};
use super::node_middleware::{wrap_chain, NodeInner, NodeMiddleware};
use super::run_context::ResumeValue;
use super::state_graph::END;
use super::{Next, NextEntry, Node, RunContext};

/// Compiled graph: immutable structure.
///
/// Runs from the first node; after each node the conditional router (when present),
/// else the node's `Next`, else the node's plain edge chooses the next node.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(super) middleware: Vec<Arc<dyn NodeMiddleware<S>>>,
    pub(super) interrupt_handler: Option<Arc<dyn InterruptHandler>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn execute_node(
        &self,
        node: Arc<dyn Node<S>>,
        state: S,
        ctx: &RunContext,
    ) -> Result<(S, Next), AgentError> {
        if self.middleware.is_empty() {
            return node.run_with_context(state, ctx).await;
        }
        let node_id = node.id().to_string();
        let ctx_owned = ctx.clone();
        let inner: NodeInner<S> = Box::new(move |s| {
            Box::pin(async move { node.run_with_context(s, &ctx_owned).await })
        });
        wrap_chain(&self.middleware, &node_id, ctx, inner)(state).await
    }

    fn resolve_next(&self, current_id: &str, state: &S, next: Next) -> Option<String> {
        match self.next_map.get(current_id) {
            Some(NextEntry::Conditional(router)) => {
                let target = router.resolve_next(state);
                tracing::debug!(from = %current_id, to = %target, "conditional routing");
                Some(target)
            }
            entry => match next {
                Next::End => None,
                Next::Node(id) => Some(id),
                Next::Continue => match entry {
                    Some(NextEntry::Unconditional(id)) => Some(id.clone()),
                    _ => None,
                },
            },
        }
    }

    async fn save(
        &self,
        config: &RunnableConfig,
        checkpoint: Checkpoint<S>,
    ) -> Result<(), AgentError> {
        if let (Some(cp), Some(_)) = (&self.checkpointer, &config.thread_id) {
            let id = cp.put(config, &checkpoint).await?;
            tracing::debug!(
                checkpoint_id = %id,
                thread_id = ?config.thread_id,
                interrupted = checkpoint.is_interrupted(),
                "checkpoint saved"
            );
        }
        Ok(())
    }

    /// Run loop shared by `invoke` and `resume`: steps through nodes until END or error.
    async fn run_loop(
        &self,
        mut state: S,
        mut current_id: String,
        mut ctx: RunContext,
    ) -> Result<S, AgentError> {
        log_graph_start(&current_id, ctx.resume.is_some());
        let mut steps: i64 = 0;

        loop {
            let node = self
                .nodes
                .get(&current_id)
                .cloned()
                .ok_or_else(|| {
                    AgentError::ExecutionFailed(format!("unknown node: {}", current_id))
                })?;
            log_node_start(&current_id);
            log_node_state(&current_id, &state);

            let result = self.execute_node(node, state.clone(), &ctx).await;
            ctx.resume = None;
            steps += 1;

            let (new_state, next) = match result {
                Ok(output) => output,
                Err(AgentError::Interrupted(interrupt)) => {
                    return Err(self
                        .on_interrupt(&ctx.config, state, current_id, interrupt, steps)
                        .await);
                }
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };

            log_node_complete(&current_id, &next);
            state = new_state;

            match self.resolve_next(&current_id, &state, next) {
                Some(id) if id != END => current_id = id,
                _ => break,
            }
        }

        self.save(
            &ctx.config,
            Checkpoint::from_state(state.clone(), CheckpointSource::Input, steps),
        )
        .await?;
        log_graph_complete(steps);
        Ok(state)
    }

    /// Checkpoints the paused continuation, notifies the handler, and returns the error
    /// to hand back to the caller.
    async fn on_interrupt(
        &self,
        config: &RunnableConfig,
        pre_node_state: S,
        node_id: String,
        interrupt: GraphInterrupt,
        steps: i64,
    ) -> AgentError {
        if self.checkpointer.is_none() || config.thread_id.is_none() {
            tracing::warn!(
                node_id = %node_id,
                "interrupt without checkpointer or thread_id; run cannot be resumed"
            );
        }
        let checkpoint = Checkpoint::from_state(pre_node_state, CheckpointSource::Loop, steps)
            .with_pending(PendingInterrupt {
                node_id,
                interrupt: interrupt.0.clone(),
            });
        if let Err(e) = self.save(config, checkpoint).await {
            log_graph_error(&e);
            return e;
        }
        if let Some(handler) = &self.interrupt_handler {
            if let Err(e) = handler.handle_interrupt(&interrupt.0) {
                tracing::warn!(error = %e, "interrupt handler failed");
            }
        }
        let err = AgentError::Interrupted(interrupt);
        log_graph_error(&err);
        err
    }

    /// Runs the graph with the given state, from the first node (or from
    /// `config.resume_from_node_id` when it names a node).
    ///
    /// Returns the final state, or `AgentError::Interrupted` when a node paused the run.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        let config = config.unwrap_or_default();
        let start = config
            .resume_from_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone());
        self.run_loop(state, start, RunContext::new(config)).await
    }

    /// Resumes the interrupted run of `config.thread_id` with `value` as the answer.
    ///
    /// Loads the latest checkpoint (or `config.checkpoint_id`), re-enters the node that
    /// interrupted with the state it originally received, and continues to END or the
    /// next interrupt. Fails with `AgentError::NoPendingInterrupt` when the thread is not
    /// waiting on an interrupt.
    pub async fn resume(&self, value: Value, config: RunnableConfig) -> Result<S, AgentError> {
        let checkpointer = self.checkpointer.as_ref().ok_or_else(|| {
            AgentError::ExecutionFailed(
                "resume requires a graph compiled with a checkpointer".into(),
            )
        })?;
        let thread_id = config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        let checkpoint = checkpointer
            .get_tuple(&config)
            .await?
            .ok_or_else(|| AgentError::NoPendingInterrupt(thread_id.clone()))?;
        let pending = checkpoint
            .pending
            .ok_or_else(|| AgentError::NoPendingInterrupt(thread_id.clone()))?;
        if !self.nodes.contains_key(&pending.node_id) {
            return Err(AgentError::ExecutionFailed(format!(
                "checkpoint references unknown node: {}",
                pending.node_id
            )));
        }
        let ctx = RunContext::new(RunnableConfig {
            checkpoint_id: None,
            ..config
        })
        .with_resume(ResumeValue {
            interrupt_id: pending.interrupt.id.clone(),
            value,
        });
        self.run_loop(checkpoint.state, pending.node_id, ctx).await
    }

    /// Latest checkpoint for the thread (or `config.checkpoint_id`); `None` without a
    /// checkpointer or when the thread has never run.
    pub async fn get_state(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, AgentError> {
        match &self.checkpointer {
            Some(cp) => Ok(cp.get_tuple(config).await?),
            None => Ok(None),
        }
    }

    /// Checkpoint history of the thread, oldest first.
    pub async fn get_state_history(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, AgentError> {
        match &self.checkpointer {
            Some(cp) => Ok(cp.list(config, limit).await?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::graph::{Interrupt, StateGraph, START};
    use crate::memory::MemorySaver;

    struct AddNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<i32> for AddNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            Ok((state + self.delta, Next::Continue))
        }
    }

    /// Interrupts until resumed; adds the resume value (a number) to the state.
    /// Records every resume value it observes.
    struct AskNode {
        seen: Arc<Mutex<Vec<Option<Value>>>>,
    }

    #[async_trait]
    impl Node<i32> for AskNode {
        fn id(&self) -> &str {
            "ask"
        }
        async fn run(&self, _state: i32) -> Result<(i32, Next), AgentError> {
            unreachable!("ask node runs with context")
        }
        async fn run_with_context(
            &self,
            state: i32,
            ctx: &RunContext,
        ) -> Result<(i32, Next), AgentError> {
            let answer = ctx.resume_for("q1").cloned();
            self.seen.lock().unwrap().push(answer.clone());
            match answer.and_then(|v| v.as_i64()) {
                Some(n) => Ok((state + n as i32, Next::Continue)),
                None => {
                    let interrupt = Interrupt::with_id(json!({"ask": state}), "q1".into());
                    Err(GraphInterrupt(interrupt).into())
                }
            }
        }
    }

    type Seen = Arc<Mutex<Vec<Option<Value>>>>;

    fn linear(checkpointer: Option<Arc<dyn Checkpointer<i32>>>) -> (CompiledStateGraph<i32>, Seen) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("one", Arc::new(AddNode { id: "one", delta: 1 }));
        graph.add_node("ask", Arc::new(AskNode { seen: seen.clone() }));
        graph.add_node("ten", Arc::new(AddNode { id: "ten", delta: 10 }));
        graph.add_edge(START, "one");
        graph.add_edge("one", "ask");
        graph.add_edge("ask", "ten");
        graph.add_edge("ten", END);
        let compiled = match checkpointer {
            Some(cp) => graph.compile_with_checkpointer(cp),
            None => graph.compile(),
        }
        .unwrap();
        (compiled, seen)
    }

    /// **Scenario**: conditional router loops until the state reaches the threshold.
    #[tokio::test]
    async fn invoke_conditional_edges_loop_until_end() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("inc", Arc::new(AddNode { id: "inc", delta: 2 }));
        graph.add_edge(START, "inc");
        graph.add_conditional_edges(
            "inc",
            Arc::new(|s: &i32| if *s < 5 { "inc".into() } else { END.into() }),
            None,
        );
        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.invoke(0, None).await.unwrap(), 6);
    }

    /// **Scenario**: interrupt saves the pre-node state and the node to re-enter.
    #[tokio::test]
    async fn interrupt_checkpoints_pending_continuation() {
        let saver: Arc<dyn Checkpointer<i32>> = Arc::new(MemorySaver::new());
        let (graph, _) = linear(Some(saver));
        let config = RunnableConfig::for_thread("t1");

        let err = graph.invoke(0, Some(config.clone())).await.unwrap_err();
        match err {
            AgentError::Interrupted(GraphInterrupt(i)) => {
                assert_eq!(i.id.as_deref(), Some("q1"));
                assert_eq!(i.value, json!({"ask": 1}));
            }
            other => panic!("expected Interrupted, got {:?}", other),
        }

        let cp = graph.get_state(&config).await.unwrap().unwrap();
        assert_eq!(cp.state, 1);
        assert_eq!(cp.metadata.source, CheckpointSource::Loop);
        assert_eq!(cp.pending.as_ref().map(|p| p.node_id.as_str()), Some("ask"));
    }

    /// **Scenario**: resume re-enters the interrupted node once; later nodes never see the value.
    #[tokio::test]
    async fn resume_continues_to_end_and_clears_pending() {
        let saver: Arc<dyn Checkpointer<i32>> = Arc::new(MemorySaver::new());
        let (graph, seen) = linear(Some(saver));
        let config = RunnableConfig::for_thread("t1");
        let _ = graph.invoke(0, Some(config.clone())).await.unwrap_err();

        let out = graph.resume(json!(5), config.clone()).await.unwrap();
        assert_eq!(out, 1 + 5 + 10);
        assert_eq!(*seen.lock().unwrap(), vec![None, Some(json!(5))]);

        let cp = graph.get_state(&config).await.unwrap().unwrap();
        assert!(!cp.is_interrupted());
        assert_eq!(graph.get_state_history(&config, None).await.unwrap().len(), 2);

        match graph.resume(json!(1), config).await {
            Err(AgentError::NoPendingInterrupt(t)) => assert_eq!(t, "t1"),
            other => panic!("expected NoPendingInterrupt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn resume_unknown_thread_or_without_checkpointer_fails() {
        let saver: Arc<dyn Checkpointer<i32>> = Arc::new(MemorySaver::new());
        let (graph, _) = linear(Some(saver));
        assert!(matches!(
            graph.resume(json!(1), RunnableConfig::for_thread("never")).await,
            Err(AgentError::NoPendingInterrupt(_))
        ));
        assert!(matches!(
            graph.resume(json!(1), RunnableConfig::default()).await,
            Err(AgentError::Checkpoint(CheckpointError::ThreadIdRequired))
        ));

        let (plain, _) = linear(None);
        assert!(matches!(
            plain.resume(json!(1), RunnableConfig::for_thread("t")).await,
            Err(AgentError::ExecutionFailed(_))
        ));
    }

    /// **Scenario**: resume_from_node_id starts the run at the named node.
    #[tokio::test]
    async fn invoke_resume_from_node_id() {
        let (graph, _) = linear(None);
        let config = RunnableConfig {
            resume_from_node_id: Some("ten".into()),
            ..RunnableConfig::default()
        };
        assert_eq!(graph.invoke(0, Some(config)).await.unwrap(), 10);
    }
}
