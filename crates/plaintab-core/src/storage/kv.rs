//! Typed key-value store bound to one backend key

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::backend::PersistenceBackend;
use super::error::{StorageError, StorageResult};

/// A single fixed key in a persistence backend
///
/// Every `get` reads from the backend; no value is cached between calls.
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn PersistenceBackend>,
    key: &'static str,
}

impl KvStore {
    pub fn new(backend: Arc<dyn PersistenceBackend>, key: &'static str) -> Self {
        Self { backend, key }
    }

    /// The backend key this store reads and writes
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Read the raw stored value
    pub async fn get_raw(&self) -> StorageResult<Option<Value>> {
        self.backend.get(self.key).await
    }

    /// Read and decode the stored value
    pub async fn get<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        match self.get_raw().await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::Decode {
                    key: self.key.to_string(),
                    source: e,
                }),
            None => Ok(None),
        }
    }

    /// Encode and store a value, replacing what was there
    pub async fn set<T: Serialize + ?Sized>(&self, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|e| StorageError::Encode {
            key: self.key.to_string(),
            source: e,
        })?;
        self.backend.set(self.key, value).await
    }
}

impl fmt::Debug for KvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStore").field("key", &self.key).finish()
    }
}
