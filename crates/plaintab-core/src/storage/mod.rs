//! Storage layer
//!
//! A synced key-value persistence backend and the typed store built on it.
//!
//! ## Architecture
//!
//! - **Backend**: `get`/`set` of JSON values by string key, possibly shared
//!   with other running instances
//! - **KvStore**: one fixed key bound to a backend, read fresh on every call
//!
//! Two keys are used: [`SETTINGS_KEY`] and [`FAVICONS_KEY`].

pub mod backend;
pub mod error;
pub mod file;
pub mod kv;
pub mod memory;

pub use backend::PersistenceBackend;
pub use error::{StorageError, StorageResult};
pub use file::JsonFileBackend;
pub use kv::KvStore;
pub use memory::MemoryBackend;

/// Key holding the settings record
pub const SETTINGS_KEY: &str = "plaintab-settings";

/// Key holding the favicon override mapping
pub const FAVICONS_KEY: &str = "plaintab-favicons";
