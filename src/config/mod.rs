// Re-exports so callers can "use authkit::config::*".
pub mod config;
pub mod logging;
pub mod refresh;
pub mod storage;

pub use config::*;
pub use logging::*;
pub use refresh::*;
pub use storage::*;
