//! Translators from high-level session actions to `TokenStore::set` calls.

use tracing::info;

use super::api::RefreshSuccess;
use crate::models::{StateUpdate, UserState};
use crate::store::TokenStore;

/// The token type assumed when a sign-in or refresh does not name one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Credentials handed to `do_sign_in`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignInPayload<T> {
    pub token: String,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub user_state: Option<T>,
}

impl<T> SignInPayload<T> {
    pub fn new(token: impl Into<String>) -> Self {
        SignInPayload {
            token: token.into(),
            token_type: None,
            refresh_token: None,
            user_state: None,
        }
    }

    pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn user_state(mut self, user_state: T) -> Self {
        self.user_state = Some(user_state);
        self
    }
}

/// Signs in. A missing user state is stored as `T::default()`, and a missing
/// refresh token leaves the current one untouched.
pub fn do_sign_in<T: UserState + Default>(
    store: &TokenStore<T>,
    payload: SignInPayload<T>,
) -> bool {
    let SignInPayload {
        token,
        token_type,
        refresh_token,
        user_state,
    } = payload;

    let mut update = StateUpdate::new()
        .auth(token, token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()))
        .user_state(user_state.unwrap_or_default());
    if let Some(refresh_token) = refresh_token {
        update = update.refresh(refresh_token);
    }

    let published = store.set(update);
    info!(signed_in = store.value().is_sign_in, "Sign-in applied");
    published
}

/// Applies the credentials from a successful refresh. Fields the callback
/// left out keep their current value, except the token type which falls
/// back to the default.
pub fn do_refresh<T: UserState>(store: &TokenStore<T>, success: RefreshSuccess<T>) -> bool {
    let RefreshSuccess {
        new_auth_token,
        new_auth_token_type,
        new_refresh_token,
        new_auth_user_state,
    } = success;

    let mut update = StateUpdate::new().auth(
        new_auth_token,
        new_auth_token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
    );
    if let Some(refresh_token) = new_refresh_token {
        update = update.refresh(refresh_token);
    }
    if let Some(user_state) = new_auth_user_state {
        update = update.user_state(user_state);
    }
    store.set(update)
}

/// Clears auth, which also clears user state and, in refresh mode, the
/// refresh token.
pub fn do_sign_out<T: UserState>(store: &TokenStore<T>) -> bool {
    let published = store.set(StateUpdate::new().sign_out());
    if published {
        info!("Signed out");
    }
    published
}
