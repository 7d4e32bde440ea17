use chrono::Utc;
use tracing::debug;

use crate::inspector::TokenInspector;
use crate::models::{AuthKitState, AuthToken, RefreshToken, UserState};
use crate::naming::NamingStrategy;
use crate::storage::Storage;

/// The raw strings found in storage at startup. A key whose read failed is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub auth_token: Option<String>,
    pub auth_type: Option<String>,
    pub user_state: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredSession {
    /// Reads all four keys. Each read is guarded on its own: a missing,
    /// corrupt or expired entry only blanks that one field.
    pub fn read(storage: &dyn Storage, naming: &dyn NamingStrategy, debug: bool) -> Self {
        let read = |key: String| match storage.get(&key) {
            Ok(value) => Some(value),
            Err(e) => {
                if debug {
                    debug!("Treating '{}' as absent: {}", key, e);
                }
                None
            }
        };

        StoredSession {
            auth_token: read(naming.auth_key()),
            auth_type: read(naming.auth_type_key()),
            user_state: read(naming.state_key()),
            refresh_token: read(naming.refresh_key()),
        }
    }
}

/// Which storage keys the derived state requires to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    Nothing,
    /// A refresh key left over from a session that ran in refresh mode.
    RefreshKey,
    /// Auth token, auth type and user state; the refresh key survives.
    AuthKeys,
    AllKeys,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derived<T> {
    pub state: AuthKitState<T>,
    pub cleanup: Cleanup,
}

impl<T> Derived<T> {
    pub fn signed_out(refresh_enabled: bool) -> Self {
        Derived {
            state: AuthKitState::signed_out(refresh_enabled),
            cleanup: Cleanup::AllKeys,
        }
    }
}

/// Builds the first state of a session from what storage held.
///
/// Refresh and auth are validated independently; a bad auth token never
/// takes a good refresh token down with it.
pub fn check_token_exist<T: UserState>(
    stored: &StoredSession,
    refresh_enabled: bool,
    inspector: &dyn TokenInspector,
    debug: bool,
) -> Derived<T> {
    let refresh = if refresh_enabled {
        stored
            .refresh_token
            .as_deref()
            .and_then(|token| valid_refresh(token, inspector, debug))
    } else {
        None
    };

    if refresh_enabled && refresh.is_none() {
        if debug {
            debug!("No valid refresh token in storage; starting signed out");
        }
        return Derived::signed_out(true);
    }

    let auth = valid_auth::<T>(stored, inspector, debug);

    match (refresh, auth) {
        (Some(refresh), Some((auth, user_state))) => Derived {
            state: AuthKitState {
                auth: Some(auth),
                refresh: Some(refresh),
                user_state,
                is_sign_in: true,
                is_using_refresh_token: true,
            },
            cleanup: Cleanup::Nothing,
        },
        (Some(refresh), None) => {
            if debug {
                debug!("Auth token unusable but refresh token valid; session is refresh-eligible");
            }
            Derived {
                state: AuthKitState {
                    refresh: Some(refresh),
                    ..AuthKitState::signed_out(true)
                },
                cleanup: Cleanup::AuthKeys,
            }
        }
        (None, Some((auth, user_state))) if !refresh_enabled => Derived {
            state: AuthKitState {
                auth: Some(auth),
                refresh: None,
                user_state,
                is_sign_in: true,
                is_using_refresh_token: false,
            },
            cleanup: if stored.refresh_token.is_some() {
                Cleanup::RefreshKey
            } else {
                Cleanup::Nothing
            },
        },
        _ => Derived::signed_out(refresh_enabled),
    }
}

fn valid_refresh(token: &str, inspector: &dyn TokenInspector, debug: bool) -> Option<RefreshToken> {
    match inspector.expires_at(token) {
        Ok(expires_at) if expires_at > Utc::now() => Some(RefreshToken {
            token: token.to_string(),
            expires_at,
        }),
        Ok(expires_at) => {
            if debug {
                debug!("Stored refresh token expired at {}", expires_at);
            }
            None
        }
        Err(e) => {
            if debug {
                debug!("Stored refresh token rejected: {}", e);
            }
            None
        }
    }
}

fn valid_auth<T: UserState>(
    stored: &StoredSession,
    inspector: &dyn TokenInspector,
    debug: bool,
) -> Option<(AuthToken, Option<T>)> {
    let (Some(token), Some(token_type), Some(user_state)) = (
        stored.auth_token.as_deref(),
        stored.auth_type.as_deref(),
        stored.user_state.as_deref(),
    ) else {
        return None;
    };

    let expires_at = match inspector.expires_at(token) {
        Ok(expires_at) if expires_at > Utc::now() => expires_at,
        Ok(expires_at) => {
            if debug {
                debug!("Stored auth token expired at {}", expires_at);
            }
            return None;
        }
        Err(e) => {
            if debug {
                debug!("Stored auth token rejected: {}", e);
            }
            return None;
        }
    };

    let user_state = match serde_json::from_str::<Option<T>>(user_state) {
        Ok(user_state) => user_state,
        Err(e) => {
            if debug {
                debug!("Stored user state is not valid JSON for this type: {}", e);
            }
            return None;
        }
    };

    Some((
        AuthToken {
            token: token.to_string(),
            token_type: token_type.to_string(),
            expires_at,
        },
        user_state,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthKitError;
    use chrono::{DateTime, Duration};
    use serde_json::{json, Value};

    /// Tokens are "<unix seconds>"; anything else fails to decode.
    struct SecondsInspector;

    impl TokenInspector for SecondsInspector {
        fn expires_at(&self, token: &str) -> Result<DateTime<Utc>, AuthKitError> {
            token
                .parse::<i64>()
                .ok()
                .and_then(|s| DateTime::from_timestamp(s, 0))
                .ok_or_else(|| AuthKitError::Token(token.to_string()))
        }
    }

    fn future() -> String {
        (Utc::now() + Duration::hours(1)).timestamp().to_string()
    }

    fn past() -> String {
        (Utc::now() - Duration::hours(1)).timestamp().to_string()
    }

    fn stored(auth: Option<String>, refresh: Option<String>) -> StoredSession {
        StoredSession {
            auth_type: auth.as_ref().map(|_| "Bearer".to_string()),
            user_state: auth.as_ref().map(|_| "{}".to_string()),
            auth_token: auth,
            refresh_token: refresh,
        }
    }

    fn derive(session: &StoredSession, refresh_enabled: bool) -> Derived<Value> {
        check_token_exist(session, refresh_enabled, &SecondsInspector, true)
    }

    #[test]
    fn test_empty_storage_without_refresh() {
        let derived = derive(&StoredSession::default(), false);
        assert_eq!(derived.state, AuthKitState::signed_out(false));
        assert_eq!(derived.cleanup, Cleanup::AllKeys);
    }

    #[test]
    fn test_valid_auth_without_refresh() {
        let token = future();
        let derived = derive(&stored(Some(token.clone()), None), false);
        assert!(derived.state.is_sign_in);
        assert_eq!(derived.state.auth.as_ref().unwrap().token, token);
        assert_eq!(derived.state.user_state, Some(json!({})));
        assert_eq!(derived.cleanup, Cleanup::Nothing);
    }

    #[test]
    fn test_leftover_refresh_key_is_removed_when_mode_off() {
        let derived = derive(&stored(Some(future()), Some(future())), false);
        assert!(derived.state.refresh.is_none());
        assert!(derived.state.is_sign_in);
        assert_eq!(derived.cleanup, Cleanup::RefreshKey);
    }

    #[test]
    fn test_both_valid_with_refresh() {
        let derived = derive(&stored(Some(future()), Some(future())), true);
        assert!(derived.state.is_sign_in);
        assert!(derived.state.refresh.is_some());
        assert_eq!(derived.cleanup, Cleanup::Nothing);
    }

    #[test]
    fn test_refresh_only_is_refresh_eligible() {
        let refresh = future();
        let derived = derive(&stored(None, Some(refresh.clone())), true);
        assert!(!derived.state.is_sign_in);
        assert!(derived.state.auth.is_none());
        assert_eq!(derived.state.refresh.as_ref().unwrap().token, refresh);
        assert_eq!(derived.cleanup, Cleanup::AuthKeys);
    }

    #[test]
    fn test_expired_auth_does_not_cascade_into_refresh() {
        let derived = derive(&stored(Some(past()), Some(future())), true);
        assert!(derived.state.refresh.is_some());
        assert!(derived.state.auth.is_none());
        assert_eq!(derived.cleanup, Cleanup::AuthKeys);
    }

    #[test]
    fn test_expired_refresh_signs_out_even_with_valid_auth() {
        let derived = derive(&stored(Some(future()), Some(past())), true);
        assert_eq!(derived, Derived::signed_out(true));
    }

    #[test]
    fn test_corrupt_user_state_drops_auth() {
        let mut session = stored(Some(future()), None);
        session.user_state = Some("{not json".to_string());
        assert_eq!(derive(&session, false), Derived::signed_out(false));
    }

    #[test]
    fn test_missing_auth_type_drops_auth() {
        let mut session = stored(Some(future()), None);
        session.auth_type = None;
        assert!(!derive(&session, false).state.is_sign_in);
    }

    #[test]
    fn test_undecodable_tokens_sign_out() {
        let session = stored(Some("garbage".to_string()), Some("garbage".to_string()));
        assert_eq!(derive(&session, true), Derived::signed_out(true));
        assert_eq!(derive(&session, false), Derived::signed_out(false));
    }
}
