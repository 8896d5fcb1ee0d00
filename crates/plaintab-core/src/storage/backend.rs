//! Persistence backend interface

use async_trait::async_trait;
use serde_json::Value;

use super::error::StorageResult;

/// A synced key-value persistence backend
///
/// Values may be written concurrently by other instances sharing the same
/// backend, so implementations must not cache reads.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;
}
