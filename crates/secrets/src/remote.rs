//! Remote secret stores that are declared but not wired up yet.

use async_trait::async_trait;

use crate::config::SecretBackend;
use crate::provider::SecretProvider;
use crate::SecretError;

/// Placeholder for managed secret stores without an implementation.
///
/// Every lookup fails with [`SecretError::NotImplemented`] so a deployment
/// that selects one of these backends refuses to start instead of silently
/// reading secrets from somewhere else.
#[derive(Debug, Clone, Copy)]
pub struct RemoteProvider {
    backend: SecretBackend,
}

impl RemoteProvider {
    pub fn new(backend: SecretBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl SecretProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        self.backend.as_str()
    }

    async fn fetch(&self, _name: &str) -> Result<Vec<u8>, SecretError> {
        Err(SecretError::NotImplemented {
            backend: self.backend.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remote_backends_fail_fast() {
        for backend in [
            SecretBackend::AwsSsm,
            SecretBackend::AwsSecretsManager,
            SecretBackend::GcpSecretManager,
        ] {
            let err = RemoteProvider::new(backend).fetch("jwt_private_key").await.unwrap_err();
            assert_eq!(err, SecretError::NotImplemented { backend: backend.as_str() });
        }
    }
}
