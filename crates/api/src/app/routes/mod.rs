pub mod auth;
pub mod authorize;
pub mod profile;
pub mod system;
