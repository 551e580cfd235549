//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KvStore;
use crate::error::Result;

/// A [`KvStore`] backed by a `HashMap`. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn add(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
