use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where and how the session is persisted.
/// - prefix: the single string every storage key is derived from.
/// - backend: the storage backend, selected by a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct StorageConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(flatten)]
    pub backend: StorageBackend,
}

fn default_prefix() -> String {
    "_auth".to_string()
}

/// The available storage backends.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageBackend {
    #[serde(rename = "cookie")]
    Cookie(CookieConfig),
    #[serde(rename = "local")]
    Local(LocalConfig),
}

/// Scoping attributes written on every auth cookie.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct CookieConfig {
    pub domain: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub same_site: SameSitePolicy,
}

fn default_path() -> String {
    "/".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

/// Local storage keeps a flat map; `file` makes it survive restarts.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct LocalConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}
