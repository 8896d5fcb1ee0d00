//! JSON file persistence backend
//!
//! All keys live in one JSON object file. Every read goes back to disk, so
//! writes made by another process are picked up on the next `get`. Writes
//! rewrite the whole file atomically: each write goes to its own temp file
//! in the same directory, which is then renamed over the store.
//!
//! Read-modify-write cycles are serialized per store path across every
//! backend in this process. Another process writing the same file at the
//! same moment can still overwrite a key this process just stored; the
//! file itself always holds one complete write.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::backend::PersistenceBackend;
use super::error::{StorageError, StorageResult};

/// File-backed persistence backend
pub struct JsonFileBackend {
    path: PathBuf,
    /// Shared by every backend on the same path in this process
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = path_lock(&path);
        Self { path, write_lock }
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_object(&self) -> StorageResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StorageError::ReadError {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StorageError::InvalidFormat {
                path: self.path.clone(),
                details: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(StorageError::InvalidFormat {
                path: self.path.clone(),
                details: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let mut map = self.read_object().await?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.read_object().await?;
        map.insert(key.to_string(), value);

        let bytes = serde_json::to_vec_pretty(&Value::Object(map)).map_err(|e| {
            StorageError::Encode {
                key: key.to_string(),
                source: e,
            }
        })?;
        atomic_write(&self.path, &bytes).await?;

        debug!("Stored '{}' in {:?}", key, self.path);
        Ok(())
    }
}

/// Write lock for a store path, created on first use
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    Arc::clone(locks.entry(path.to_path_buf()).or_default())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state, and
/// concurrent writers never share a temp file.
pub(crate) async fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| StorageError::from_io(e, dir.clone()))?;

    let target = path.to_path_buf();
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || {
        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| StorageError::from_io(e, dir.clone()))?;
        temp.write_all(&data)
            .map_err(|e| StorageError::from_io(e, temp.path().to_path_buf()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StorageError::from_io(e, temp.path().to_path_buf()))?;
        temp.persist(&target)
            .map_err(|e| StorageError::from_io(e.error, target.clone()))?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::WriteError {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::Other, e),
    })?
}
