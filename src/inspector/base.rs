use chrono::{DateTime, Utc};

use crate::error::AuthKitError;

/// Extracts the expiry instant from a bearer token.
///
/// Every expiry held by the token store comes from here, so a token and the
/// expiry recorded next to it can never disagree.
pub trait TokenInspector: Send + Sync {
    fn expires_at(&self, token: &str) -> Result<DateTime<Utc>, AuthKitError>;

    /// Whether the token decodes and its expiry lies strictly in the future.
    fn is_unexpired(&self, token: &str) -> bool {
        self.expires_at(token)
            .map(|expires_at| expires_at > Utc::now())
            .unwrap_or(false)
    }
}
