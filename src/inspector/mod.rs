pub mod base;
pub mod jwt_inspector;

pub use base::TokenInspector;
pub use jwt_inspector::JwtInspector;
