use thiserror::Error;

use warden_secrets::SecretError;
use warden_tokens::TokenError;

/// Startup/reload failures and collaborator faults. None of these are
/// per-request authentication outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("token key material rejected: {0}")]
    Token(#[from] TokenError),

    #[error("principal lookup failed: {0}")]
    PrincipalLookup(String),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn principal_lookup(msg: impl Into<String>) -> Self {
        Self::PrincipalLookup(msg.into())
    }
}
