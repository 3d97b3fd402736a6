use thiserror::Error;

/// Link generation / verification failure (internal detail).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("link signing key not initialized")]
    KeyNotInitialized,

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("parameter '{0}' is reserved")]
    ReservedParameter(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("missing link parameters")]
    MissingParameters,

    #[error("link has expired")]
    LinkExpired,

    #[error("invalid link signature")]
    InvalidSignature,

    #[error("link was issued for a different purpose")]
    PurposeMismatch,
}

/// What callers outside the engine get to see.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkFailure {
    #[error("invalid or expired link")]
    InvalidOrExpired,

    #[error("link service unavailable")]
    Misconfigured,
}

impl LinkError {
    /// Flatten to the externally visible outcome.
    pub fn to_public(&self) -> LinkFailure {
        match self {
            LinkError::KeyNotInitialized => LinkFailure::Misconfigured,
            _ => LinkFailure::InvalidOrExpired,
        }
    }
}
