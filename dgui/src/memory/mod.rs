//! Checkpointing for suspended and multi-turn conversations.
//!
//! [`RunnableConfig`] names the thread; [`Checkpointer`] stores [`Checkpoint`]s for it.
//! [`MemorySaver`] is the in-memory implementation used by the agent runner.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;

pub use checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource, PendingInterrupt,
};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
