//! Environment-variable backend.

use async_trait::async_trait;

use crate::SecretError;
use crate::provider::{SecretProvider, decode_payload, validate_name};

/// Reads `<PREFIX><NAME>` from the process environment.
///
/// The logical name is upper-cased and `-`/`.` become `_`, so
/// `jwt_private_key` with prefix `WARDEN_` reads `WARDEN_JWT_PRIVATE_KEY`.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
}

impl EnvProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable consulted for a logical secret name.
    pub fn variable_name(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| match c {
                '-' | '.' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

#[async_trait]
impl SecretProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SecretError> {
        validate_name(name)?;
        let var = self.variable_name(name);
        let raw = std::env::var_os(&var).ok_or_else(|| SecretError::NotFound {
            backend: "env",
            name: name.to_string(),
        })?;
        let raw = raw.into_string().map_err(|_| SecretError::InvalidEncoding {
            name: name.to_string(),
            expected: "unicode",
        })?;
        decode_payload(name, raw.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn variable_names_are_upper_snake_case() {
        let p = EnvProvider::new("WARDEN_");
        assert_eq!(p.variable_name("jwt_private_key"), "WARDEN_JWT_PRIVATE_KEY");
        assert_eq!(p.variable_name("link-signing.key"), "WARDEN_LINK_SIGNING_KEY");
    }

    #[tokio::test]
    #[serial]
    async fn reads_plain_and_base64_values() {
        unsafe {
            std::env::set_var("WARDEN_TEST_ENV_PLAIN", "s3cret");
            std::env::set_var("WARDEN_TEST_ENV_BIN", "base64:3q2+7w==");
        }
        let p = EnvProvider::new("WARDEN_TEST_ENV_");

        assert_eq!(p.fetch("plain").await.unwrap(), b"s3cret");
        assert_eq!(p.fetch("bin").await.unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);

        unsafe {
            std::env::remove_var("WARDEN_TEST_ENV_PLAIN");
            std::env::remove_var("WARDEN_TEST_ENV_BIN");
        }
    }

    #[tokio::test]
    #[serial]
    async fn missing_variable_is_not_found() {
        let p = EnvProvider::new("WARDEN_TEST_ENV_");
        let err = p.fetch("definitely_unset").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { backend: "env", .. }));
    }
}
