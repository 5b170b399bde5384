//! Run context passed into nodes: the invoke config and, on resume, the caller's answer.

use serde_json::Value;

use crate::memory::RunnableConfig;

/// Answer supplied to an interrupted node when the run is resumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeValue {
    /// Id of the interrupt being answered (the pending tool call id).
    pub interrupt_id: Option<String>,
    pub value: Value,
}

/// Context for one node execution.
///
/// `resume` is only set for the first node of a resumed run (the one that interrupted);
/// the graph clears it before running any later node.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub config: RunnableConfig,
    pub resume: Option<ResumeValue>,
}

impl RunContext {
    pub fn new(config: RunnableConfig) -> Self {
        Self {
            config,
            resume: None,
        }
    }

    pub fn with_resume(mut self, resume: ResumeValue) -> Self {
        self.resume = Some(resume);
        self
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.config.thread_id.as_deref()
    }

    /// Resume value addressed to `interrupt_id`. An answer without an id matches any interrupt.
    pub fn resume_for(&self, interrupt_id: &str) -> Option<&Value> {
        self.resume.as_ref().and_then(|r| match r.interrupt_id.as_deref() {
            Some(id) if id != interrupt_id => None,
            _ => Some(&r.value),
        })
    }
}
