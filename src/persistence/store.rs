use std::{collections::HashMap, future::Future, sync::Arc};

use anyhow::Result;
use tokio::sync::RwLock;

/// String key-value storage for session snapshots.
pub trait SnapshotStore: Send + Sync + 'static {
    fn write(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    fn read(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Process-local store; lives as long as the process does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl SnapshotStore for MemoryStore {
    async fn write(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
