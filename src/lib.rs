//! Client-side authentication state.
//!
//! A [`store::TokenStore`] holds the auth token, an optional refresh token
//! and an application user-state payload, mirrors them into a
//! [`storage::Storage`] backend and publishes every change to subscribers.
//! A [`refresh::RefreshOrchestrator`] keeps the session alive through an
//! application-supplied refresh callback.

pub mod config;
pub mod error;
pub mod inspector;
pub mod models;
pub mod naming;
pub mod observable;
pub mod refresh;
pub mod storage;
pub mod store;
pub mod utils;

pub use error::AuthKitError;
pub use models::{AuthKitState, StateUpdate};
pub use observable::{Observer, Subscription};
pub use refresh::{RefreshConfig, RefreshHandle, RefreshOrchestrator};
pub use store::TokenStore;
