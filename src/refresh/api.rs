use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::CallbackError;
use crate::models::{AuthKitState, UserState};

/// What the refresh callback is handed, captured from the state at the
/// moment of the call.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshParams<T> {
    pub auth_token: Option<String>,
    pub refresh_token: Option<String>,
    pub auth_user_state: Option<T>,
}

impl<T: Clone> RefreshParams<T> {
    pub fn from_state(state: &AuthKitState<T>) -> Self {
        RefreshParams {
            auth_token: state.auth.as_ref().map(|auth| auth.token.clone()),
            refresh_token: state.refresh.as_ref().map(|refresh| refresh.token.clone()),
            auth_user_state: state.user_state.clone(),
        }
    }
}

/// New credentials returned by a successful refresh.
///
/// Deserializes from the camelCase shape refresh endpoints commonly answer
/// with, e.g. `{"newAuthToken": "...", "newRefreshToken": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSuccess<T> {
    pub new_auth_token: String,
    #[serde(default)]
    pub new_auth_token_type: Option<String>,
    #[serde(default)]
    pub new_refresh_token: Option<String>,
    #[serde(default)]
    pub new_auth_user_state: Option<T>,
}

impl<T> RefreshSuccess<T> {
    pub fn new(new_auth_token: impl Into<String>) -> Self {
        RefreshSuccess {
            new_auth_token: new_auth_token.into(),
            new_auth_token_type: None,
            new_refresh_token: None,
            new_auth_user_state: None,
        }
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.new_auth_token_type = Some(token_type.into());
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.new_refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_user_state(mut self, user_state: T) -> Self {
        self.new_auth_user_state = Some(user_state);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome<T> {
    Success(RefreshSuccess<T>),
    /// The backend refused the refresh; the session is signed out.
    Failure,
}

/// The application's refresh call, usually a request to its auth backend.
///
/// An `Err` is handled like `Failure` and additionally reported on the
/// store's error channel.
#[async_trait::async_trait]
pub trait RefreshApi<T: UserState>: Send + Sync {
    async fn refresh(&self, params: RefreshParams<T>) -> Result<RefreshOutcome<T>, CallbackError>;
}

/// Any async closure with the right signature is a refresh callback.
#[async_trait::async_trait]
impl<T, F, Fut> RefreshApi<T> for F
where
    T: UserState,
    F: Fn(RefreshParams<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RefreshOutcome<T>, CallbackError>> + Send,
{
    async fn refresh(&self, params: RefreshParams<T>) -> Result<RefreshOutcome<T>, CallbackError> {
        (self)(params).await
    }
}
