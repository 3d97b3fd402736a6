//! Backend capability interface.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose};

use crate::SecretError;

/// Prefix marking a base64-encoded binary payload.
pub const BASE64_PREFIX: &str = "base64:";

/// A source of named secrets.
///
/// Implementations return the raw value; empty-value checks and retries are
/// the resolver's job.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Backend name for diagnostics (`env`, `file`, `vault`, ...).
    fn name(&self) -> &'static str;

    /// Look up one secret by its logical name.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SecretError>;
}

/// Apply the `base64:` convention to a raw textual value.
pub(crate) fn decode_payload(name: &str, raw: Vec<u8>) -> Result<Vec<u8>, SecretError> {
    let Some(encoded) = raw.strip_prefix(BASE64_PREFIX.as_bytes()) else {
        return Ok(raw);
    };
    general_purpose::STANDARD
        .decode(encoded.trim_ascii())
        .map_err(|_| SecretError::InvalidEncoding {
            name: name.to_string(),
            expected: "base64",
        })
}

/// Logical names are plain identifiers: no path separators, no traversal.
pub(crate) fn validate_name(name: &str) -> Result<(), SecretError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(SecretError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        let out = decode_payload("k", b"hunter2".to_vec()).unwrap();
        assert_eq!(out, b"hunter2");
    }

    #[test]
    fn base64_prefix_is_decoded() {
        let out = decode_payload("k", b"base64:AAEC/w==".to_vec()).unwrap();
        assert_eq!(out, vec![0x00, 0x01, 0x02, 0xff]);
    }

    #[test]
    fn bad_base64_names_the_secret_only() {
        let err = decode_payload("link_signing_key", b"base64:!!!".to_vec()).unwrap_err();
        assert_eq!(
            err,
            SecretError::InvalidEncoding {
                name: "link_signing_key".into(),
                expected: "base64"
            }
        );
    }

    #[test]
    fn traversal_names_are_rejected() {
        assert!(validate_name("jwt_private_key").is_ok());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("").is_err());
    }
}
