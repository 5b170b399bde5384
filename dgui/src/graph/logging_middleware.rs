//! Logging middleware that records node enter/exit around each node.run call.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Instant;

use crate::error::AgentError;
use crate::graph::Next;

use super::{NodeInner, NodeMiddleware, RunContext};

/// Middleware that logs node enter/exit (with elapsed time) through `tracing`.
///
/// Generic over state type `S`; only node id, thread id and outcome are logged.
pub struct LoggingNodeMiddleware<S> {
    _phantom: std::marker::PhantomData<fn() -> S>,
}

impl<S> Default for LoggingNodeMiddleware<S> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        ctx: &RunContext,
        inner: NodeInner<S>,
    ) -> Result<(S, Next), AgentError> {
        let thread_id = ctx.thread_id().unwrap_or("-");
        tracing::debug!(node = node_id, thread_id, resumed = ctx.resume.is_some(), "node enter");
        let started = Instant::now();
        let result = inner(state).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok((_, next)) => {
                tracing::debug!(node = node_id, thread_id, ?next, elapsed_ms, "node exit")
            }
            Err(AgentError::Interrupted(i)) => {
                tracing::debug!(
                    node = node_id,
                    thread_id,
                    interrupt_id = ?i.0.id,
                    elapsed_ms,
                    "node exit: interrupted"
                )
            }
            Err(e) => {
                tracing::warn!(
                    node = node_id,
                    thread_id,
                    error = %e,
                    elapsed_ms,
                    "node exit: error"
                )
            }
        }
        result
    }
}
