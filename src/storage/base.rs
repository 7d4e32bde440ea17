use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::{cookie_storage::CookieStorage, local_storage::LocalStorage};
use crate::config::{StorageBackend, StorageConfig};
use crate::error::AuthKitError;

/// Key/value persistence where every entry carries its own expiry.
///
/// Backends with native expiry (cookies) lean on it; flat maps embed the
/// expiry next to the value and enforce it on read.
pub trait Storage: Send + Sync {
    /// Fails with `StorageInvalid` when the key is absent or the value corrupt,
    /// and with `StorageExpired` when an embedded expiry has passed.
    fn get(&self, key: &str) -> Result<String, AuthKitError>;

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>);

    /// Idempotent; removing an absent key is not an error.
    fn remove(&self, key: &str);

    /// A short label for logs.
    fn get_name(&self) -> &str;
}

/// Creates the storage backend selected by the `type` tag of the config.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, AuthKitError> {
    match &config.backend {
        StorageBackend::Cookie(cookie_config) => {
            info!(
                "Using cookie storage for domain '{}'",
                cookie_config.domain
            );
            Ok(Arc::new(CookieStorage::new(cookie_config)?))
        }
        StorageBackend::Local(local_config) => match &local_config.file {
            Some(path) => {
                info!("Using local storage persisted at {}", path.display());
                Ok(Arc::new(LocalStorage::open(path)?))
            }
            None => {
                info!("Using in-memory local storage");
                Ok(Arc::new(LocalStorage::in_memory()))
            }
        },
    }
}
