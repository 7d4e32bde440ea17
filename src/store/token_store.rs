use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::derive::{check_token_exist, Cleanup, Derived, StoredSession};
use super::sync::StorageSync;
use crate::config::ConfigV1;
use crate::error::AuthKitError;
use crate::inspector::{JwtInspector, TokenInspector};
use crate::models::{AuthKitState, AuthToken, Field, RefreshToken, StateUpdate, UserState};
use crate::naming::{NamingStrategy, PrefixNaming};
use crate::observable::{Observer, Subject, Subscription};
use crate::storage::{create_storage, Storage};

/// Owns the authentication state of one session.
///
/// Construct it once, wrap it in an `Arc` and hand that to every consumer.
/// All mutations go through `set`. Each accepted change is written to storage
/// under the same lock that makes it current, so storage always ends on the
/// latest state, and only then delivered to observers.
pub struct TokenStore<T: UserState> {
    subject: Subject<AuthKitState<T>>,
    inspector: Arc<dyn TokenInspector>,
    storage: Arc<dyn Storage>,
    sync: StorageSync,
    refresh_enabled: bool,
    debug: bool,
}

impl<T: UserState> TokenStore<T> {
    pub fn new(
        refresh_enabled: bool,
        storage: Arc<dyn Storage>,
        naming: Arc<dyn NamingStrategy>,
        inspector: Arc<dyn TokenInspector>,
        debug: bool,
    ) -> Self {
        let stored = StoredSession::read(storage.as_ref(), naming.as_ref(), debug);

        // The inspector is pluggable; a panic inside it must only demote the
        // session, never abort startup.
        let derived = panic::catch_unwind(AssertUnwindSafe(|| {
            check_token_exist::<T>(&stored, refresh_enabled, inspector.as_ref(), debug)
        }))
        .unwrap_or_else(|_| {
            warn!("Initial auth state derivation failed; starting signed out");
            Derived::signed_out(refresh_enabled)
        });

        let sync = StorageSync::new(storage.clone(), naming, debug);
        match derived.cleanup {
            Cleanup::Nothing => {}
            Cleanup::RefreshKey => sync.remove_refresh(),
            Cleanup::AuthKeys => sync.remove_auth(),
            Cleanup::AllKeys => sync.remove_all(),
        }

        info!(
            signed_in = derived.state.is_sign_in,
            refresh_eligible = derived.state.is_refresh_eligible(),
            "Token store initialized from {} storage",
            storage.get_name()
        );

        TokenStore {
            subject: Subject::new(derived.state),
            inspector,
            storage,
            sync,
            refresh_enabled,
            debug,
        }
    }

    /// Builds the store with the storage backend, key prefix and debug flag
    /// from `config`, a `PrefixNaming` and a `JwtInspector`.
    pub fn from_config(config: &ConfigV1) -> Result<Self, AuthKitError> {
        config.validate()?;
        let storage = create_storage(&config.storage)?;
        Ok(Self::new(
            config.uses_refresh_token(),
            storage,
            Arc::new(PrefixNaming::new(config.storage.prefix.clone())),
            Arc::new(JwtInspector::new()),
            config.debug,
        ))
    }

    /// A snapshot of the current state.
    pub fn value(&self) -> AuthKitState<T> {
        self.subject.value()
    }

    /// The observer immediately receives the current state, then every change.
    pub fn subscribe(&self, observer: Observer<AuthKitState<T>>) -> Subscription {
        self.subject.subscribe(observer)
    }

    pub fn is_using_refresh_token(&self) -> bool {
        self.refresh_enabled
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn user_state(&self) -> Option<T> {
        self.value().user_state
    }

    pub fn auth_header(&self) -> Option<String> {
        self.value().auth_header()
    }

    /// Checks the auth expiry against the clock right now. A state that is
    /// still marked signed in but whose token has lapsed is signed out here.
    pub fn is_authenticated(&self) -> bool {
        let state = self.value();
        match &state.auth {
            Some(auth) if auth.expires_at > Utc::now() => true,
            Some(_) => {
                info!("Auth token has expired; signing out");
                self.set(StateUpdate::new().sign_out());
                false
            }
            None => false,
        }
    }

    /// Applies a partial update. Returns whether a new state was published.
    pub fn set(&self, update: StateUpdate<T>) -> bool {
        if self.subject.is_completed() {
            warn!("Ignoring update on a completed token store");
            return false;
        }

        let published = self.subject.next_with_commit(
            |current| self.reduce(current, update),
            |next| self.sync.write(next),
        );
        match published {
            Some(state) => {
                if self.debug {
                    debug!(
                        signed_in = state.is_sign_in,
                        has_refresh = state.refresh.is_some(),
                        "Auth state published"
                    );
                }
                true
            }
            None => {
                if self.debug {
                    debug!("Auth state unchanged; nothing published");
                }
                false
            }
        }
    }

    /// Delivers `error` to every observer with an error callback.
    pub fn report_error(&self, error: AuthKitError) {
        self.subject.error(&error);
    }

    /// Ends the session stream. Observers get `on_complete`; later `set`
    /// calls are ignored.
    pub fn complete(&self) {
        info!("Token store completed");
        self.subject.complete();
    }

    fn reduce(&self, current: &AuthKitState<T>, update: StateUpdate<T>) -> AuthKitState<T> {
        let now = Utc::now();
        let mut next = current.clone();

        if let Some(user_state) = update.user_state {
            next.user_state = Some(user_state);
        }

        // Step 6 only forces the refresh slot empty when this very call
        // removed auth, not when auth was already absent.
        let mut auth_cleared = false;
        match update.auth {
            Field::Set(input) => match self.inspector.expires_at(&input.token) {
                Ok(expires_at) if expires_at > now => {
                    next.auth = Some(AuthToken {
                        token: input.token,
                        token_type: input.token_type,
                        expires_at,
                    });
                    next.is_sign_in = true;
                }
                outcome => {
                    if self.debug {
                        match outcome {
                            Ok(expires_at) => {
                                debug!("Incoming auth token expired at {}", expires_at)
                            }
                            Err(e) => debug!("Incoming auth token rejected: {}", e),
                        }
                    }
                    auth_cleared = true;
                }
            },
            Field::Clear => auth_cleared = true,
            Field::Unchanged => {}
        }

        if auth_cleared {
            next.auth = None;
            next.is_sign_in = false;
            next.user_state = None;
        }

        if self.refresh_enabled {
            if auth_cleared {
                next.refresh = None;
            } else {
                match update.refresh {
                    Field::Set(token) => match self.inspector.expires_at(&token) {
                        Ok(expires_at) if expires_at > now => {
                            next.refresh = Some(RefreshToken { token, expires_at });
                        }
                        outcome => {
                            if self.debug {
                                match outcome {
                                    Ok(expires_at) => {
                                        debug!("Incoming refresh token expired at {}", expires_at)
                                    }
                                    Err(e) => debug!("Incoming refresh token rejected: {}", e),
                                }
                            }
                            next = AuthKitState::signed_out(true);
                        }
                    },
                    Field::Clear => next.refresh = None,
                    Field::Unchanged => {}
                }
            }
        } else {
            next.refresh = None;
        }

        if next.auth.is_none() {
            next.user_state = None;
        }
        next
    }
}
