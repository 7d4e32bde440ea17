pub mod actions;
pub mod api;
pub mod orchestrator;

pub use actions::{do_refresh, do_sign_in, do_sign_out, SignInPayload, DEFAULT_TOKEN_TYPE};
pub use api::{RefreshApi, RefreshOutcome, RefreshParams, RefreshSuccess};
pub use orchestrator::{RefreshConfig, RefreshHandle, RefreshOrchestrator};
