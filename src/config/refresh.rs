use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The longest accepted refresh interval: one year.
pub const MAX_REFRESH_INTERVAL_SECS: i64 = 365 * 24 * 60 * 60;

/// The declarative half of the refresh setup. The callback itself is code
/// and is paired with these settings in `refresh::RefreshConfig`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct RefreshSettings {
    /// Seconds between two periodic refresh calls while signed in.
    pub interval_secs: i64,
    /// Whether the host renders a placeholder until the initial refresh settles.
    #[serde(default)]
    pub initial_placeholder: bool,
}

impl RefreshSettings {
    /// The interval as a `Duration`. Out-of-range values are rejected by
    /// `ConfigV1::validate`; here they only show up clamped.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.clamp(0, MAX_REFRESH_INTERVAL_SECS) as u64)
    }
}
