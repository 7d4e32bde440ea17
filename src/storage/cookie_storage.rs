use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use cookie::{Cookie, CookieJar, SameSite};
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use super::Storage;
use crate::config::{CookieConfig, SameSitePolicy};
use crate::error::AuthKitError;

/// Cookie-backed storage.
///
/// Every value is written as a cookie scoped by the configured domain, path,
/// secure flag and same-site policy, expiring when its token does. Expiry is
/// native: an expired cookie reads as absent, exactly as a browser would drop
/// it. The jar records what changed so a host can flush `Set-Cookie` headers.
pub struct CookieStorage {
    jar: Mutex<CookieJar>,
    domain: String,
    path: String,
    secure: bool,
    same_site: SameSite,
}

impl CookieStorage {
    pub fn new(config: &CookieConfig) -> Result<Self, AuthKitError> {
        if config.domain.trim().is_empty() {
            return Err(AuthKitError::Config(
                "Cookie storage requires a cookie domain".into(),
            ));
        }

        Ok(CookieStorage {
            jar: Mutex::new(CookieJar::new()),
            domain: config.domain.clone(),
            path: config.path.clone(),
            secure: config.secure,
            same_site: match config.same_site {
                SameSitePolicy::Strict => SameSite::Strict,
                SameSitePolicy::Lax => SameSite::Lax,
                SameSitePolicy::None => SameSite::None,
            },
        })
    }

    /// Seeds the jar from a `Cookie:` request header, as sent back by a browser.
    /// Unparseable pairs are skipped.
    pub fn from_cookie_header(config: &CookieConfig, header: &str) -> Result<Self, AuthKitError> {
        let storage = Self::new(config)?;
        {
            let mut jar = storage.jar();
            for parsed in Cookie::split_parse_encoded(header.to_string()) {
                match parsed {
                    Ok(cookie) => jar.add_original(cookie.into_owned()),
                    Err(e) => debug!("Skipping unparseable cookie pair: {}", e),
                }
            }
        }
        Ok(storage)
    }

    /// The `Set-Cookie` header values for every cookie written or removed
    /// since the jar was created.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.jar()
            .delta()
            .map(|cookie| cookie.encoded().to_string())
            .collect()
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scoped(&self, key: &str, value: &str) -> cookie::CookieBuilder<'static> {
        Cookie::build((key.to_string(), value.to_string()))
            .domain(self.domain.clone())
            .path(self.path.clone())
            .secure(self.secure)
            .same_site(self.same_site)
    }
}

fn to_offset_datetime(instant: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(instant.timestamp())
        .unwrap_or_else(|_| PrimitiveDateTime::MAX.assume_utc())
}

impl Storage for CookieStorage {
    fn get(&self, key: &str) -> Result<String, AuthKitError> {
        let jar = self.jar();
        let cookie = jar
            .get(key)
            .ok_or_else(|| AuthKitError::StorageInvalid(format!("Cookie '{}' not found", key)))?;

        if let Some(expires) = cookie.expires_datetime() {
            if expires <= OffsetDateTime::now_utc() {
                return Err(AuthKitError::StorageInvalid(format!(
                    "Cookie '{}' has expired",
                    key
                )));
            }
        }
        Ok(cookie.value().to_string())
    }

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>) {
        let cookie = self
            .scoped(key, value)
            .expires(to_offset_datetime(expires_at))
            .build();
        self.jar().add(cookie);
    }

    fn remove(&self, key: &str) {
        let mut jar = self.jar();
        if jar.get(key).is_some() {
            jar.remove(self.scoped(key, "").build());
        }
    }

    fn get_name(&self) -> &str {
        "cookie"
    }
}
