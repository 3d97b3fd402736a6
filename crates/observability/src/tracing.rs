//! Tracing/logging initialization.
//!
//! JSON lines by default, filtered through `RUST_LOG`. Callers log identifiers
//! (key ids, subjects, secret *names*); secret values never reach a field.

use tracing_subscriber::EnvFilter;

/// Selects the output format (`WARDEN_LOG_FORMAT`).
pub const LOG_FORMAT_VAR: &str = "WARDEN_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    /// Human-readable, for local runs.
    Text,
}

impl LogFormat {
    /// `text`/`pretty` select [`LogFormat::Text`]; anything else is JSON.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "text" || v == "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            format: LogFormat::parse(std::env::var(LOG_FORMAT_VAR).ok().as_deref()),
            ..Self::default()
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Returns `false` when a global subscriber was already installed (the call is
/// then a no-op).
pub fn init(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Text => builder.try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_selection() {
        assert_eq!(LogFormat::parse(None), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("TEXT")), LogFormat::Text);
        assert_eq!(LogFormat::parse(Some(" pretty ")), LogFormat::Text);
        assert_eq!(LogFormat::parse(Some("xml")), LogFormat::Json);
    }

    #[test]
    fn second_init_is_a_no_op() {
        let config = LogConfig::default();
        let _ = init(&config);
        assert!(!init(&config));
    }
}
