//! Settings state
//!
//! Loads the persisted settings record, merges it over the defaults, and
//! keeps the published record in step with storage. Writes go through to
//! the store before anything is published; a failed write publishes nothing.
//!
//! Saves from this process are serialized, and `update_one` always starts
//! from the latest published record, so back-to-back single-field updates
//! never drop each other's changes.

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{SettingKey, Settings};
use crate::publisher::Publisher;
use crate::storage::KvStore;

/// Owner of the published settings record
pub struct SettingsState {
    store: KvStore,
    publisher: Publisher,
    write_lock: Mutex<()>,
}

impl SettingsState {
    pub fn new(store: KvStore, publisher: Publisher) -> Self {
        Self {
            store,
            publisher,
            write_lock: Mutex::new(()),
        }
    }

    /// Currently published settings
    pub fn current(&self) -> Settings {
        self.publisher.settings()
    }

    /// Load persisted settings over the defaults and publish them
    pub async fn load(&self) -> Result<Settings> {
        let settings = match self.store.get_raw().await? {
            Some(persisted) => merge_with_defaults(persisted),
            None => {
                debug!("No stored settings, using defaults");
                Settings::default()
            }
        };

        self.publisher.publish_settings(settings.clone());
        Ok(settings)
    }

    /// Persist the full record, then publish it
    pub async fn save(&self, settings: Settings) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_locked(settings).await
    }

    /// Replace one field of the latest published record and save
    ///
    /// The value must have the field's type; an unknown key or mismatched
    /// value is rejected without touching storage.
    pub async fn update_one(&self, key: SettingKey, value: Value) -> Result<Settings> {
        let _guard = self.write_lock.lock().await;

        let current = self.publisher.settings();
        let mut fields = to_fields(&current)?;
        fields.insert(key.as_str().to_string(), value);

        let updated: Settings =
            serde_json::from_value(Value::Object(fields)).map_err(|e| Error::InvalidSetting {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        self.save_locked(updated.clone()).await?;
        Ok(updated)
    }

    /// Restore and persist the defaults
    pub async fn reset(&self) -> Result<()> {
        self.save(Settings::default()).await
    }

    async fn save_locked(&self, settings: Settings) -> Result<()> {
        self.store.set(&settings).await?;
        debug!("Saved settings under '{}'", self.store.key());
        self.publisher.publish_settings(settings);
        Ok(())
    }
}

fn to_fields(settings: &Settings) -> Result<Map<String, Value>> {
    let reason = match serde_json::to_value(settings) {
        Ok(Value::Object(fields)) => return Ok(fields),
        Ok(other) => format!("expected an object, found {}", other),
        Err(e) => e.to_string(),
    };
    Err(Error::InvalidSetting {
        key: "settings".to_string(),
        reason,
    })
}

/// Merge a persisted (possibly partial) record over the defaults
///
/// Persisted fields replace defaults one at a time. Unknown fields are
/// ignored; a field whose value has the wrong type keeps its default.
pub fn merge_with_defaults(persisted: Value) -> Settings {
    let Value::Object(persisted) = persisted else {
        warn!("Stored settings are not an object, using defaults");
        return Settings::default();
    };

    let mut merged = Settings::default();
    for key in SettingKey::ALL {
        let Some(value) = persisted.get(key.as_str()) else {
            continue;
        };

        let Ok(mut fields) = to_fields(&merged) else {
            break;
        };
        fields.insert(key.as_str().to_string(), value.clone());

        match serde_json::from_value(Value::Object(fields)) {
            Ok(candidate) => merged = candidate,
            Err(e) => warn!("Ignoring stored setting '{}': {}", key, e),
        }
    }

    merged
}
