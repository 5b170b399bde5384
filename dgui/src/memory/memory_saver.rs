//! In-memory checkpointer (MemorySaver). Not persistent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// In-memory checkpointer. Key: (thread_id, checkpoint_ns); each thread has a list of
/// checkpoints, newest last.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in `StateGraph::compile_with_checkpointer`.
pub struct MemorySaver<S> {
    inner: Arc<RwLock<HashMap<String, Vec<Checkpoint<S>>>>>,
}

impl<S> MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn thread_key(config: &RunnableConfig) -> Result<String, CheckpointError> {
        let thread_id = config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        Ok(format!("{}:{}", thread_id, config.checkpoint_ns))
    }
}

impl<S> Default for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let key = Self::thread_key(config)?;
        let mut guard = self.inner.write().await;
        guard.entry(key).or_default().push(checkpoint.clone());
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let guard = self.inner.read().await;
        let list = match guard.get(&key) {
            Some(l) => l,
            None => return Ok(None),
        };
        match &config.checkpoint_id {
            Some(cid) => list
                .iter()
                .find(|cp| &cp.id == cid)
                .cloned()
                .map(Some)
                .ok_or_else(|| CheckpointError::NotFound(cid.clone())),
            None => Ok(list.last().cloned()),
        }
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let guard = self.inner.read().await;
        let list = match guard.get(&key) {
            Some(l) => l,
            None => return Ok(Vec::new()),
        };
        let skip = limit.map_or(0, |n| list.len().saturating_sub(n));
        Ok(list
            .iter()
            .skip(skip)
            .map(|cp| CheckpointListItem {
                checkpoint_id: cp.id.clone(),
                metadata: cp.metadata.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::CheckpointSource;

    #[tokio::test]
    async fn put_requires_thread_id() {
        let saver = MemorySaver::<i32>::new();
        let cp = Checkpoint::from_state(1, CheckpointSource::Input, 0);
        let err = saver.put(&RunnableConfig::default(), &cp).await.unwrap_err();
        assert!(matches!(err, CheckpointError::ThreadIdRequired));
    }

    #[tokio::test]
    async fn get_tuple_returns_latest_or_requested() {
        let saver = MemorySaver::<i32>::new();
        let config = RunnableConfig::for_thread("t1");
        let first = Checkpoint::from_state(1, CheckpointSource::Input, 1);
        let second = Checkpoint::from_state(2, CheckpointSource::Input, 2);
        saver.put(&config, &first).await.unwrap();
        saver.put(&config, &second).await.unwrap();

        assert_eq!(saver.get_tuple(&config).await.unwrap().unwrap().state, 2);

        let pinned = RunnableConfig {
            checkpoint_id: Some(first.id.clone()),
            ..config.clone()
        };
        assert_eq!(saver.get_tuple(&pinned).await.unwrap().unwrap().state, 1);

        let missing = RunnableConfig {
            checkpoint_id: Some("nope".into()),
            ..config.clone()
        };
        assert!(matches!(
            saver.get_tuple(&missing).await,
            Err(CheckpointError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn threads_are_isolated_and_list_respects_limit() {
        let saver = MemorySaver::<i32>::new();
        let a = RunnableConfig::for_thread("a");
        for i in 0..3 {
            saver
                .put(&a, &Checkpoint::from_state(i, CheckpointSource::Input, i as i64))
                .await
                .unwrap();
        }
        assert!(saver
            .get_tuple(&RunnableConfig::for_thread("b"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(saver.list(&a, None).await.unwrap().len(), 3);
        let newest = saver.list(&a, Some(1)).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].metadata.step, 2);
    }
}
