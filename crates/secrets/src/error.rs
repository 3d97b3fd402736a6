use thiserror::Error;

/// Secret resolution failure.
///
/// Messages name the backend and the logical secret, never the value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret '{name}' not found in {backend} backend")]
    NotFound { backend: &'static str, name: String },

    #[error("{backend} backend unavailable: {reason}")]
    Unavailable { backend: &'static str, reason: String },

    #[error("{backend} backend rejected the request for '{name}' (status {status})")]
    Rejected {
        backend: &'static str,
        name: String,
        status: u16,
    },

    #[error("secret '{name}' resolved to an empty value")]
    EmptySecret { name: String },

    #[error("secret backend '{backend}' is not implemented")]
    NotImplemented { backend: &'static str },

    #[error("{backend} backend is misconfigured: {reason}")]
    Misconfigured { backend: &'static str, reason: String },

    #[error("invalid secret name '{name}'")]
    InvalidName { name: String },

    #[error("secret '{name}' is not valid {expected}")]
    InvalidEncoding { name: String, expected: &'static str },
}

impl SecretError {
    /// Whether retrying the same lookup may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SecretError::Unavailable { .. })
    }
}
