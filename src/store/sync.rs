use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::AuthKitState;
use crate::naming::NamingStrategy;
use crate::storage::Storage;

/// Mirrors published states into storage.
///
/// Each key expires together with the token it belongs to: the auth token,
/// its type and the user state at the auth expiry, the refresh token at its own.
pub struct StorageSync {
    storage: Arc<dyn Storage>,
    naming: Arc<dyn NamingStrategy>,
    debug: bool,
}

impl StorageSync {
    pub fn new(storage: Arc<dyn Storage>, naming: Arc<dyn NamingStrategy>, debug: bool) -> Self {
        StorageSync {
            storage,
            naming,
            debug,
        }
    }

    pub fn write<T: Serialize>(&self, state: &AuthKitState<T>) {
        match &state.auth {
            Some(auth) => match serde_json::to_string(&state.user_state) {
                Ok(user_state) => {
                    self.storage
                        .set(&self.naming.auth_key(), &auth.token, auth.expires_at);
                    self.storage
                        .set(&self.naming.auth_type_key(), &auth.token_type, auth.expires_at);
                    self.storage
                        .set(&self.naming.state_key(), &user_state, auth.expires_at);
                    if self.debug {
                        debug!(
                            "Persisted auth to {} storage, expiring at {}",
                            self.storage.get_name(),
                            auth.expires_at
                        );
                    }
                }
                Err(e) => {
                    warn!("User state cannot be serialized, auth not persisted: {}", e);
                    self.remove_auth();
                }
            },
            None => self.remove_auth(),
        }

        match &state.refresh {
            Some(refresh) if state.is_using_refresh_token => {
                self.storage
                    .set(&self.naming.refresh_key(), &refresh.token, refresh.expires_at);
            }
            _ => self.remove_refresh(),
        }
    }

    pub fn remove_auth(&self) {
        self.storage.remove(&self.naming.auth_key());
        self.storage.remove(&self.naming.auth_type_key());
        self.storage.remove(&self.naming.state_key());
    }

    pub fn remove_refresh(&self) {
        self.storage.remove(&self.naming.refresh_key());
    }

    pub fn remove_all(&self) {
        for key in self.naming.all_keys() {
            self.storage.remove(&key);
        }
    }
}
