//! Invoke config: thread_id, checkpoint_id, checkpoint_ns, resume_from_node_id.

/// Config for a single invoke. Identifies the thread and optional checkpoint.
///
/// When using a checkpointer, invoke must provide at least `thread_id`.
///
/// **Interaction**: Passed to `CompiledStateGraph::invoke(state, config)` and
/// `Checkpointer::put` / `get_tuple` / `list`.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Unique id for this conversation. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// If set, load this checkpoint instead of the latest.
    pub checkpoint_id: Option<String>,
    /// Optional namespace for checkpoints. Default is empty.
    pub checkpoint_ns: String,
    /// When set, the graph starts from this node instead of the first (resume after an
    /// interrupt raised by "tool").
    pub resume_from_node_id: Option<String>,
}

impl RunnableConfig {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: RunnableConfig::default() has all optionals None and checkpoint_ns empty.
    #[test]
    fn runnable_config_default_all_optionals_none_or_empty() {
        let c = RunnableConfig::default();
        assert!(c.thread_id.is_none());
        assert!(c.checkpoint_id.is_none());
        assert!(c.checkpoint_ns.is_empty());
        assert!(c.resume_from_node_id.is_none());
    }

    #[test]
    fn for_thread_sets_only_thread_id() {
        let c = RunnableConfig::for_thread("t1");
        assert_eq!(c.thread_id.as_deref(), Some("t1"));
        assert!(c.checkpoint_id.is_none());
    }
}
