//! Node middleware: wrap node.run with external async logic (around pattern).
//!
//! Set via `StateGraph::with_middleware`. Several middlewares nest in the order they
//! were added: the first one added is the outermost.

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AgentError;

use super::{Next, RunContext};

/// Future returned by a wrapped node run.
pub type NodeFuture<S> = Pin<Box<dyn Future<Output = Result<(S, Next), AgentError>> + Send>>;

/// The wrapped call: must be invoked exactly once to execute the node.
pub type NodeInner<S> = Box<dyn FnOnce(S) -> NodeFuture<S> + Send>;

/// Async middleware that wraps node.run.
#[async_trait]
pub trait NodeMiddleware<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// - `node_id`: current node id
    /// - `state`: state passed to the node
    /// - `ctx`: run context of this execution (thread id, resume value)
    /// - `inner`: actual node.run logic
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        ctx: &RunContext,
        inner: NodeInner<S>,
    ) -> Result<(S, Next), AgentError>;
}

/// Wraps `inner` in every middleware of `chain`, first element outermost.
pub(crate) fn wrap_chain<S>(
    chain: &[Arc<dyn NodeMiddleware<S>>],
    node_id: &str,
    ctx: &RunContext,
    inner: NodeInner<S>,
) -> NodeInner<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    chain.iter().rev().fold(inner, |inner, mw| {
        let mw = Arc::clone(mw);
        let node_id = node_id.to_string();
        let ctx = ctx.clone();
        let wrapped: NodeInner<S> = Box::new(move |s: S| -> NodeFuture<S> {
            Box::pin(async move { mw.around_run(&node_id, s, &ctx, inner).await })
        });
        wrapped
    })
}
