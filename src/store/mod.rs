pub mod derive;
pub mod sync;
pub mod token_store;

// Re-export the engine so callers can do "use authkit::store::TokenStore;"
pub use derive::{check_token_exist, Cleanup, Derived, StoredSession};
pub use sync::StorageSync;
pub use token_store::TokenStore;
