//! Durable key-value storage for encoded covers.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A string key-value store that outlives the process (or pretends to).
///
/// Values are opaque encoded images. Implementations may refuse a write, for
/// example when over quota; the cover cache treats every error as "not
/// stored" and carries on.
#[async_trait]
pub trait DurableStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value under `key`.
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Durable store held in process memory.
///
/// Used for tests and ephemeral sessions; share one instance between two
/// cover caches to simulate a session restart. An optional per-entry quota
/// rejects oversized writes the way a browser's storage quota would.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values longer than `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self { entries: RwLock::default(), quota: Some(quota) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota
            && value.len() > quota
        {
            exn::bail!(ErrorKind::QuotaExceeded { len: value.len(), quota });
        }
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
