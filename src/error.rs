use thiserror::Error;

/// Errors raised by the token lifecycle engine and its collaborators.
///
/// Only `Config` ever reaches the caller as a hard failure. Token and storage
/// errors are recovered inside the store by demoting the session to
/// signed-out, and `Refresh` is delivered on the observers' error channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthKitError {
    /// The token could not be decoded or carries no usable `exp` claim.
    #[error("Token error: {0}")]
    Token(String),

    /// The storage key is absent or its value is corrupt.
    #[error("Storage value invalid: {0}")]
    StorageInvalid(String),

    /// The storage value is present but past its embedded expiry.
    #[error("Storage value expired: {0}")]
    StorageExpired(String),

    /// Invalid construction parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The application's refresh callback was rejected.
    #[error("Refresh callback failed: {0}")]
    Refresh(String),
}

/// Error type returned by application refresh callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = AuthKitError> = std::result::Result<T, E>;
