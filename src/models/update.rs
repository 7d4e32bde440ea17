/// One field of a partial update.
///
/// `set` must tell "leave it alone", "clear it" and "replace it" apart, so a
/// plain `Option` is not enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<V> {
    #[default]
    Unchanged,
    Clear,
    Set(V),
}

impl<V> Field<V> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Field::Unchanged)
    }
}

impl<V> From<Option<V>> for Field<V> {
    /// `Some` replaces, `None` clears.
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => Field::Set(v),
            None => Field::Clear,
        }
    }
}

/// An incoming auth credential. Its expiry is decoded by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInput {
    pub token: String,
    pub token_type: String,
}

/// A partial update of the session, applied by `TokenStore::set`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate<T> {
    pub auth: Field<AuthInput>,
    /// The raw refresh token string; its expiry is decoded by the store.
    pub refresh: Field<String>,
    /// `Some` overwrites the user state, `None` leaves it as is.
    pub user_state: Option<T>,
}

impl<T> Default for StateUpdate<T> {
    fn default() -> Self {
        StateUpdate {
            auth: Field::Unchanged,
            refresh: Field::Unchanged,
            user_state: None,
        }
    }
}

impl<T> StateUpdate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(mut self, token: impl Into<String>, token_type: impl Into<String>) -> Self {
        self.auth = Field::Set(AuthInput {
            token: token.into(),
            token_type: token_type.into(),
        });
        self
    }

    /// Explicitly clears auth, which signs the session out.
    pub fn sign_out(mut self) -> Self {
        self.auth = Field::Clear;
        self
    }

    pub fn refresh(mut self, token: impl Into<String>) -> Self {
        self.refresh = Field::Set(token.into());
        self
    }

    pub fn clear_refresh(mut self) -> Self {
        self.refresh = Field::Clear;
        self
    }

    pub fn user_state(mut self, user_state: T) -> Self {
        self.user_state = Some(user_state);
        self
    }

    /// True when applying this update cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.auth.is_unchanged() && self.refresh.is_unchanged() && self.user_state.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let update: StateUpdate<u8> = StateUpdate::new()
            .auth("t", "Bearer")
            .refresh("r")
            .user_state(7);
        assert_eq!(
            update.auth,
            Field::Set(AuthInput {
                token: "t".to_string(),
                token_type: "Bearer".to_string()
            })
        );
        assert_eq!(update.refresh, Field::Set("r".to_string()));
        assert_eq!(update.user_state, Some(7));
        assert!(!update.is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        let update: StateUpdate<u8> = StateUpdate::default();
        assert!(update.is_empty());
        assert!(!StateUpdate::<u8>::new().sign_out().is_empty());
        assert!(!StateUpdate::<u8>::new().clear_refresh().is_empty());
    }

    #[test]
    fn test_field_from_option() {
        assert_eq!(Field::from(Some(1)), Field::Set(1));
        assert_eq!(Field::<i32>::from(None), Field::Clear);
    }
}
