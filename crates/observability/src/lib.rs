//! Process-wide logging setup shared by the engine binary and its tests.

/// Initialize process-wide observability with settings from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() -> bool {
    tracing::init(&tracing::LogConfig::from_env())
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat};
