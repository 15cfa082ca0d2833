//! Tracing/logging setup shared by hosts of the session core and the
//! reference backend.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat};

/// Initialize process-wide logging with defaults (JSON, `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(&LogConfig::default());
}

/// Initialize logging for a test binary (captured per test).
pub fn init_for_tests() {
    self::tracing::init_for_tests();
}
