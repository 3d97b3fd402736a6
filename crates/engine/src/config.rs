//! Engine configuration, read once at startup.

use chrono::Duration;

use warden_secrets::SecretsConfig;
use warden_tokens::TokenTtls;

use crate::EngineError;

pub const ACCESS_TTL_VAR: &str = "WARDEN_ACCESS_TOKEN_TTL_SECS";
pub const IDENTITY_TTL_VAR: &str = "WARDEN_IDENTITY_TOKEN_TTL_SECS";
pub const REFRESH_TTL_VAR: &str = "WARDEN_REFRESH_TOKEN_TTL_SECS";
pub const CLOCK_SKEW_VAR: &str = "WARDEN_CLOCK_SKEW_SECS";

const DEFAULT_CLOCK_SKEW_SECS: i64 = 30;

/// Logical secret names, resolved through whichever backend is configured.
pub mod secret_names {
    pub const JWT_PRIVATE_KEY: &str = "jwt_private_key";
    pub const JWT_PUBLIC_KEY: &str = "jwt_public_key";
    pub const JWT_KEY_ID: &str = "jwt_key_id";
    pub const JWT_PREVIOUS_PUBLIC_KEY: &str = "jwt_previous_public_key";
    pub const JWT_PREVIOUS_KEY_ID: &str = "jwt_previous_key_id";
    pub const LINK_SIGNING_KEY: &str = "link_signing_key";
}

#[derive(Debug)]
pub struct EngineConfig {
    pub secrets: SecretsConfig,
    pub ttls: TokenTtls,
    pub clock_skew: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            secrets: SecretsConfig::default(),
            ttls: TokenTtls::default(),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }
}

impl EngineConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Unset lifetimes keep their defaults; set-but-invalid ones are an error,
    /// never silently replaced.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = TokenTtls::default();
        let ttls = TokenTtls {
            access: seconds(&lookup, ACCESS_TTL_VAR, 1)?.unwrap_or(defaults.access),
            identity: seconds(&lookup, IDENTITY_TTL_VAR, 1)?.unwrap_or(defaults.identity),
            refresh: seconds(&lookup, REFRESH_TTL_VAR, 1)?.unwrap_or(defaults.refresh),
        };
        let clock_skew = seconds(&lookup, CLOCK_SKEW_VAR, 0)?
            .unwrap_or(Duration::seconds(DEFAULT_CLOCK_SKEW_SECS));

        Ok(Self {
            secrets: SecretsConfig::from_lookup(&lookup),
            ttls,
            clock_skew,
        })
    }
}

fn seconds<F>(lookup: &F, var: &str, min: i64) -> Result<Option<Duration>, EngineError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs >= min)
        .and_then(Duration::try_seconds)
        .map(Some)
        .ok_or_else(|| {
            EngineError::config(format!(
                "{var} must be an integer number of seconds >= {min}, got '{raw}'"
            ))
        })
}
