//! Checkpoint and metadata types.
//!
//! A checkpoint is a state snapshot for one thread, plus the interrupted continuation
//! when the run stopped at an interrupt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::Interrupt;

/// Source of the checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Saved at the end of a completed run.
    #[default]
    Input,
    /// Saved inside the run loop, when a node interrupted.
    Loop,
    /// Saved from a manual state update.
    Update,
}

/// Metadata for a single checkpoint (source and step).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// Number of nodes run in the invoke that produced this checkpoint.
    pub step: i64,
}

/// The paused continuation of an interrupted run: which node to re-enter and what it raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub node_id: String,
    pub interrupt: Interrupt,
}

/// State snapshot for one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    /// UUID v4.
    pub id: String,
    pub ts: DateTime<Utc>,
    pub state: S,
    pub metadata: CheckpointMetadata,
    /// Set when the run stopped at an interrupt; `state` is then the input of `node_id`.
    pub pending: Option<PendingInterrupt>,
}

impl<S> Checkpoint<S> {
    pub fn from_state(state: S, source: CheckpointSource, step: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: Utc::now(),
            state,
            metadata: CheckpointMetadata { source, step },
            pending: None,
        }
    }

    pub fn with_pending(mut self, pending: PendingInterrupt) -> Self {
        self.pending = Some(pending);
        self
    }

    pub fn is_interrupted(&self) -> bool {
        self.pending.is_some()
    }
}

/// Item returned by `Checkpointer::list`.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}
