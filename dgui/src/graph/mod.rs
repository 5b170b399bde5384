//! Minimal state-graph runtime: nodes, edges, conditional routing, middleware,
//! interrupts and checkpointed resume.
//!
//! Build a [`StateGraph`], `compile` it into a [`CompiledStateGraph`], then `invoke`.
//! A node pauses the run by returning `AgentError::Interrupted`; with a checkpointer the
//! run is resumed later through [`CompiledStateGraph::resume`].

mod compile_error;
mod compiled;
mod conditional;
mod interrupt;
mod logging;
mod logging_middleware;
mod next;
mod node;
mod node_middleware;
mod run_context;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use interrupt::{DefaultInterruptHandler, GraphInterrupt, Interrupt, InterruptHandler};
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_node_state,
};
pub use logging_middleware::LoggingNodeMiddleware;
pub use next::Next;
pub use node::Node;
pub use node_middleware::{NodeFuture, NodeInner, NodeMiddleware};
pub use run_context::{ResumeValue, RunContext};
pub use state_graph::{StateGraph, END, START};
