use thiserror::Error;

/// Token issuance / verification failure (internal detail).
///
/// Verification variants must not be shown to callers outside the engine;
/// use [`TokenError::to_public`] at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing key not initialized")]
    KeyNotInitialized,

    #[error("private key does not match public key for kid '{0}'")]
    KeyMismatch(String),

    #[error("invalid key material for kid '{0}'")]
    InvalidKey(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed token")]
    MalformedToken,

    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("missing claim '{0}'")]
    MissingClaim(&'static str),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("unknown signing key id")]
    UnknownKeyId,

    #[error("unexpected token type (expected {expected})")]
    WrongTokenType { expected: &'static str },

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// What callers outside the engine get to see.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("authentication unavailable")]
    Misconfigured,
}

impl TokenError {
    /// Flatten to the externally visible outcome.
    ///
    /// Every verification failure becomes `Unauthenticated`, so a caller cannot
    /// tell an expired token from a forged one.
    pub fn to_public(&self) -> AuthFailure {
        match self {
            TokenError::KeyNotInitialized
            | TokenError::KeyMismatch(_)
            | TokenError::InvalidKey(_)
            | TokenError::Signing(_) => AuthFailure::Misconfigured,
            _ => AuthFailure::Unauthenticated,
        }
    }
}

impl From<warden_core::DomainError> for TokenError {
    fn from(value: warden_core::DomainError) -> Self {
        match value {
            warden_core::DomainError::Validation(msg) | warden_core::DomainError::InvalidId(msg) => {
                TokenError::InvalidInput(msg)
            }
        }
    }
}
