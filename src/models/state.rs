use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bounds every application user-state payload must meet: it is compared for
/// change suppression, shared across tasks, and persisted as JSON.
pub trait UserState: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> UserState for T where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// The signed-in credential. `expires_at` is always decoded from `token`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    /// The scheme used in the `Authorization` header, usually "Bearer".
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// The refresh credential. `expires_at` is always decoded from `token`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The whole authentication state of one session.
///
/// Values are replaced, never edited in place: the store computes a new
/// `AuthKitState` for every accepted mutation and publishes it only when it
/// differs from the previous one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthKitState<T> {
    pub auth: Option<AuthToken>,
    pub refresh: Option<RefreshToken>,
    pub user_state: Option<T>,
    pub is_sign_in: bool,
    pub is_using_refresh_token: bool,
}

impl<T> AuthKitState<T> {
    /// Fully signed out: no auth, no refresh, no user state.
    pub fn signed_out(is_using_refresh_token: bool) -> Self {
        AuthKitState {
            auth: None,
            refresh: None,
            user_state: None,
            is_sign_in: false,
            is_using_refresh_token,
        }
    }

    /// `"<type> <token>"`, ready for an `Authorization` header.
    pub fn auth_header(&self) -> Option<String> {
        self.auth
            .as_ref()
            .map(|auth| format!("{} {}", auth.token_type, auth.token))
    }

    /// Signed out but holding a refresh token the orchestrator can use.
    pub fn is_refresh_eligible(&self) -> bool {
        !self.is_sign_in
            && self.is_using_refresh_token
            && self
                .refresh
                .as_ref()
                .is_some_and(|refresh| refresh.expires_at > Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::Value;

    #[test]
    fn test_signed_out_state() {
        let state: AuthKitState<Value> = AuthKitState::signed_out(true);
        assert!(state.auth.is_none());
        assert!(state.refresh.is_none());
        assert!(state.user_state.is_none());
        assert!(!state.is_sign_in);
        assert!(state.is_using_refresh_token);
        assert_eq!(state.auth_header(), None);
    }

    #[test]
    fn test_auth_header() {
        let mut state: AuthKitState<Value> = AuthKitState::signed_out(false);
        state.auth = Some(AuthToken {
            token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        });
        state.is_sign_in = true;
        assert_eq!(state.auth_header().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_refresh_eligibility() {
        let mut state: AuthKitState<Value> = AuthKitState::signed_out(true);
        assert!(!state.is_refresh_eligible());

        state.refresh = Some(RefreshToken {
            token: "r".to_string(),
            expires_at: Utc::now() + Duration::days(1),
        });
        assert!(state.is_refresh_eligible());

        state.refresh.as_mut().unwrap().expires_at = Utc::now() - Duration::seconds(1);
        assert!(!state.is_refresh_eligible());
    }
}
