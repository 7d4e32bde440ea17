pub mod state;
pub mod update;

pub use state::{AuthKitState, AuthToken, RefreshToken, UserState};
pub use update::{AuthInput, Field, StateUpdate};
