//! In-memory persistence backend
//!
//! Clones share one map, which models several page instances attached to
//! the same synced storage area.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::backend::PersistenceBackend;
use super::error::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, Value>,
    fail_reads: Option<String>,
    fail_writes: Option<String>,
    writes: usize,
}

/// In-memory backend with shared state across clones
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with one value
    pub fn with_value(key: &str, value: Value) -> Self {
        let backend = Self::new();
        backend.lock().values.insert(key.to_string(), value);
        backend
    }

    /// Make every subsequent `get` fail with `message`, or succeed again with `None`
    pub fn fail_reads(&self, message: Option<&str>) {
        self.lock().fail_reads = message.map(str::to_string);
    }

    /// Make every subsequent `set` fail with `message`, or succeed again with `None`
    pub fn fail_writes(&self, message: Option<&str>) {
        self.lock().fail_writes = message.map(str::to_string);
    }

    /// Read a value without going through the async interface
    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-write; the map is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let inner = self.lock();
        if let Some(ref message) = inner.fail_reads {
            return Err(StorageError::Backend {
                key: key.to_string(),
                message: message.clone(),
            });
        }
        Ok(inner.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut inner = self.lock();
        if let Some(ref message) = inner.fail_writes {
            return Err(StorageError::Backend {
                key: key.to_string(),
                message: message.clone(),
            });
        }
        inner.values.insert(key.to_string(), value);
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_absent() {
        let backend = MemoryBackend::new();
        assert!(backend.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let backend = MemoryBackend::new();
        backend.set("k", json!({"a": 1})).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(json!({"a": 1})));
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let first = MemoryBackend::new();
        let second = first.clone();

        first.set("k", json!("from first")).await.unwrap();
        assert_eq!(second.get("k").await.unwrap(), Some(json!("from first")));

        // Last writer wins
        second.set("k", json!("from second")).await.unwrap();
        assert_eq!(first.get("k").await.unwrap(), Some(json!("from second")));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_value() {
        let backend = MemoryBackend::with_value("k", json!(1));
        backend.fail_writes(Some("quota exceeded"));

        let err = backend.set("k", json!(2)).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
        assert_eq!(backend.snapshot("k"), Some(json!(1)));

        backend.fail_writes(None);
        backend.set("k", json!(2)).await.unwrap();
        assert_eq!(backend.snapshot("k"), Some(json!(2)));
    }
}
