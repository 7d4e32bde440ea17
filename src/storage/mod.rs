pub mod base;
pub mod cookie_storage;
pub mod local_storage;

pub use base::{create_storage, Storage};
pub use cookie_storage::CookieStorage;
pub use local_storage::LocalStorage;
