//! Storage key layout.
//!
//! The token store never spells out key names itself; it asks a
//! `NamingStrategy`, so the physical layout can change without touching it.

/// Maps a session to the four physical storage keys it uses.
pub trait NamingStrategy: Send + Sync {
    fn auth_key(&self) -> String;
    fn auth_type_key(&self) -> String;
    fn state_key(&self) -> String;
    fn refresh_key(&self) -> String;

    /// All four keys, in a fixed order. Used when wiping a session.
    fn all_keys(&self) -> [String; 4] {
        [
            self.auth_key(),
            self.auth_type_key(),
            self.state_key(),
            self.refresh_key(),
        ]
    }
}

/// Derives every key from one prefix: `p_auth`, `p_auth_type`, `p_state`, `p_refresh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixNaming {
    prefix: String,
}

impl PrefixNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        PrefixNaming {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl NamingStrategy for PrefixNaming {
    fn auth_key(&self) -> String {
        format!("{}_auth", self.prefix)
    }

    fn auth_type_key(&self) -> String {
        format!("{}_auth_type", self.prefix)
    }

    fn state_key(&self) -> String {
        format!("{}_state", self.prefix)
    }

    fn refresh_key(&self) -> String {
        format!("{}_refresh", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_naming_keys() {
        let naming = PrefixNaming::new("_auth");
        assert_eq!(naming.auth_key(), "_auth_auth");
        assert_eq!(naming.auth_type_key(), "_auth_auth_type");
        assert_eq!(naming.state_key(), "_auth_state");
        assert_eq!(naming.refresh_key(), "_auth_refresh");
    }

    #[test]
    fn test_all_keys_are_distinct() {
        let naming = PrefixNaming::new("app");
        let keys = naming.all_keys();
        assert_eq!(keys, ["app_auth", "app_auth_type", "app_state", "app_refresh"]);
    }
}
