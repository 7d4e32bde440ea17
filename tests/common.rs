#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use authkit::error::AuthKitError;
use authkit::inspector::JwtInspector;
use authkit::models::AuthKitState;
use authkit::naming::PrefixNaming;
use authkit::observable::{Observer, Subscription};
use authkit::storage::{LocalStorage, Storage};
use authkit::store::TokenStore;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

pub const PREFIX: &str = "_auth";
pub const SECRET: &str = "integration-secret";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: String,
}

pub fn profile(name: &str) -> Profile {
    Profile {
        name: name.to_string(),
    }
}

pub fn mint_token(sub: &str, exp: DateTime<Utc>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: exp.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_ref()),
    )
    .expect("JWT should encode")
}

/// A token valid for `hours` more hours.
pub fn valid_token(sub: &str, hours: i64) -> String {
    mint_token(sub, Utc::now() + Duration::hours(hours))
}

pub fn expired_token(sub: &str) -> String {
    mint_token(sub, Utc::now() - Duration::hours(1))
}

/// Wraps a `LocalStorage` and counts mutations.
pub struct RecordingStorage {
    inner: LocalStorage,
    sets: AtomicUsize,
    removes: AtomicUsize,
}

impl RecordingStorage {
    pub fn new() -> Self {
        RecordingStorage {
            inner: LocalStorage::in_memory(),
            sets: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
        }
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.sets.store(0, Ordering::SeqCst);
        self.removes.store(0, Ordering::SeqCst);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Storage for RecordingStorage {
    fn get(&self, key: &str) -> Result<String, AuthKitError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>) {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, expires_at);
    }

    fn remove(&self, key: &str) {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key);
    }

    fn get_name(&self) -> &str {
        "recording"
    }
}

pub fn build_store(refresh_enabled: bool, storage: Arc<dyn Storage>) -> Arc<TokenStore<Profile>> {
    Arc::new(TokenStore::new(
        refresh_enabled,
        storage,
        Arc::new(PrefixNaming::new(PREFIX)),
        Arc::new(JwtInspector::new()),
        true,
    ))
}

/// Collects every state the store publishes.
pub fn record_states(
    store: &TokenStore<Profile>,
) -> (Arc<Mutex<Vec<AuthKitState<Profile>>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = store.subscribe(Observer::new(move |state: &AuthKitState<Profile>| {
        sink.lock().unwrap().push(state.clone());
    }));
    (seen, subscription)
}

pub fn key(suffix: &str) -> String {
    format!("{}_{}", PREFIX, suffix)
}
