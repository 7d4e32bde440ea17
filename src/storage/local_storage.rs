use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::Storage;
use crate::error::AuthKitError;

/// Separates the embedded expiry from the value: `<epoch-millis>^&*&^<value>`.
pub const EXPIRY_DELIMITER: &str = "^&*&^";

/// A flat key/value map without native expiry, modelled on browser local
/// storage. Each value is prefixed with its expiry in epoch milliseconds; a
/// read past that instant deletes the entry and reports `StorageExpired`.
///
/// With a backing file the whole map is rewritten as JSON after every
/// mutation so it survives a restart.
pub struct LocalStorage {
    entries: Mutex<BTreeMap<String, String>>,
    file: Option<PathBuf>,
}

impl LocalStorage {
    pub fn in_memory() -> Self {
        LocalStorage {
            entries: Mutex::new(BTreeMap::new()),
            file: None,
        }
    }

    /// Opens (or starts) a map persisted at `path`. A missing file is an empty
    /// map; an unreadable or non-JSON file is a configuration error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuthKitError> {
        let path = path.as_ref();
        let entries = if path.exists() {
            let raw = fs::read_to_string(path).map_err(|e| {
                AuthKitError::Config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    AuthKitError::Config(format!("{} is not a JSON map: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(LocalStorage {
            entries: Mutex::new(entries),
            file: Some(path.to_path_buf()),
        })
    }

    /// The raw stored string, embedded expiry included.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    /// Writes a raw string as-is, bypassing the expiry encoding.
    pub fn set_raw(&self, key: &str, raw: &str) {
        let mut entries = self.entries();
        entries.insert(key.to_string(), raw.to_string());
        self.persist(&entries);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        let Some(path) = &self.file else {
            return;
        };
        let result = serde_json::to_string_pretty(entries)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Failed to persist local storage to {}: {}", path.display(), e);
        }
    }
}

/// Splits a stored string into its expiry and value.
fn decode_entry(key: &str, raw: &str) -> Result<(DateTime<Utc>, String), AuthKitError> {
    let (millis, value) = raw.split_once(EXPIRY_DELIMITER).ok_or_else(|| {
        AuthKitError::StorageInvalid(format!("Value of '{}' has no expiry delimiter", key))
    })?;
    let millis: i64 = millis.parse().map_err(|_| {
        AuthKitError::StorageInvalid(format!("Value of '{}' has a corrupt expiry", key))
    })?;
    let expires_at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        AuthKitError::StorageInvalid(format!("Value of '{}' has an out of range expiry", key))
    })?;
    Ok((expires_at, value.to_string()))
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<String, AuthKitError> {
        let mut entries = self.entries();
        let raw = entries
            .get(key)
            .ok_or_else(|| AuthKitError::StorageInvalid(format!("Key '{}' not found", key)))?;

        let (expires_at, value) = decode_entry(key, raw)?;
        if expires_at <= Utc::now() {
            debug!("Dropping expired local storage entry '{}'", key);
            entries.remove(key);
            self.persist(&entries);
            return Err(AuthKitError::StorageExpired(format!(
                "Key '{}' expired at {}",
                key, expires_at
            )));
        }
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>) {
        let raw = format!(
            "{}{}{}",
            expires_at.timestamp_millis(),
            EXPIRY_DELIMITER,
            value
        );
        let mut entries = self.entries();
        entries.insert(key.to_string(), raw);
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    fn get_name(&self) -> &str {
        "local"
    }
}
