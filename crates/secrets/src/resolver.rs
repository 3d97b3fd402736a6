//! Retrying resolver on top of a single backend.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{SecretSlice, SecretString};
use tracing::{debug, warn};

use crate::{SecretError, SecretProvider};

/// Bounded retry with linear backoff (`attempt * backoff`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Resolves named secrets from the configured backend.
#[derive(Clone)]
pub struct SecretResolver {
    provider: Arc<dyn SecretProvider>,
    retry: RetryPolicy,
}

impl core::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretResolver")
            .field("backend", &self.provider.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl SecretResolver {
    pub fn new(provider: Arc<dyn SecretProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    pub fn backend(&self) -> &'static str {
        self.provider.name()
    }

    /// Resolve a secret as raw bytes.
    pub async fn get_secret(&self, name: &str) -> Result<SecretSlice<u8>, SecretError> {
        let bytes = self.fetch_non_empty(name).await?;
        Ok(SecretSlice::from(bytes))
    }

    /// Resolve a secret that must be valid UTF-8 (PEM keys, key ids).
    pub async fn get_secret_string(&self, name: &str) -> Result<SecretString, SecretError> {
        let bytes = self.fetch_non_empty(name).await?;
        let text = String::from_utf8(bytes).map_err(|_| SecretError::InvalidEncoding {
            name: name.to_string(),
            expected: "utf-8",
        })?;
        Ok(SecretString::from(text))
    }

    /// Like [`get_secret_string`](Self::get_secret_string), but a missing
    /// secret is `Ok(None)`. Empty values are still an error.
    pub async fn get_optional_string(
        &self,
        name: &str,
    ) -> Result<Option<SecretString>, SecretError> {
        match self.get_secret_string(name).await {
            Ok(value) => Ok(Some(value)),
            Err(SecretError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_non_empty(&self, name: &str) -> Result<Vec<u8>, SecretError> {
        let bytes = self.fetch_with_retry(name).await?;
        if bytes.is_empty() {
            return Err(SecretError::EmptySecret {
                name: name.to_string(),
            });
        }
        Ok(bytes)
    }

    async fn fetch_with_retry(&self, name: &str) -> Result<Vec<u8>, SecretError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.provider.fetch(name).await {
                Ok(bytes) => {
                    debug!(backend = self.provider.name(), secret = name, attempt, "secret resolved");
                    return Ok(bytes);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff * attempt;
                    warn!(
                        backend = self.provider.name(),
                        secret = name,
                        attempt,
                        error = %err,
                        "transient secret backend failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use secrecy::ExposeSecret;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Fails with `Unavailable` for the first `failures` calls, then returns `value`.
    struct FlakyProvider {
        failures: u32,
        value: Vec<u8>,
        calls: AtomicU32,
        call_times: Mutex<Vec<Instant>>,
    }

    impl FlakyProvider {
        fn new(failures: u32, value: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                failures,
                value: value.to_vec(),
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SecretProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch(&self, _name: &str) -> Result<Vec<u8>, SecretError> {
            self.call_times.lock().unwrap().push(Instant::now());
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(SecretError::Unavailable {
                    backend: "flaky",
                    reason: "timeout".into(),
                })
            } else {
                Ok(self.value.clone())
            }
        }
    }

    struct MissingProvider;

    #[async_trait]
    impl SecretProvider for MissingProvider {
        fn name(&self) -> &'static str {
            "missing"
        }

        async fn fetch(&self, name: &str) -> Result<Vec<u8>, SecretError> {
            Err(SecretError::NotFound {
                backend: "missing",
                name: name.to_string(),
            })
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn recovers_from_transient_failures_within_bound() {
        let provider = FlakyProvider::new(2, b"key");
        let resolver = SecretResolver::new(provider.clone(), fast_retry());

        let secret = resolver.get_secret("k").await.unwrap();
        assert_eq!(secret.expose_secret(), b"key");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let provider = FlakyProvider::new(10, b"key");
        let resolver = SecretResolver::new(provider.clone(), fast_retry());

        let err = resolver.get_secret("k").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_linearly_with_the_attempt() {
        let base = Duration::from_millis(200);
        let provider = FlakyProvider::new(10, b"key");
        let resolver = SecretResolver::new(
            provider.clone(),
            RetryPolicy {
                max_attempts: 3,
                backoff: base,
            },
        );

        assert!(resolver.get_secret("k").await.is_err());

        let times = provider.call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], base);
        assert_eq!(times[2] - times[1], base * 2);
    }

    #[tokio::test]
    async fn empty_value_is_an_error() {
        let provider = FlakyProvider::new(0, b"");
        let resolver = SecretResolver::new(provider, fast_retry());

        let err = resolver.get_secret("link_signing_key").await.unwrap_err();
        assert_eq!(
            err,
            SecretError::EmptySecret {
                name: "link_signing_key".into()
            }
        );
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let resolver = SecretResolver::new(Arc::new(MissingProvider), fast_retry());
        let err = resolver.get_secret("k").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound { .. }));
    }

    #[tokio::test]
    async fn string_lookup_rejects_invalid_utf8() {
        let provider = FlakyProvider::new(0, &[0xff, 0xfe]);
        let resolver = SecretResolver::new(provider, fast_retry());
        let err = resolver.get_secret_string("k").await.unwrap_err();
        assert!(matches!(err, SecretError::InvalidEncoding { expected: "utf-8", .. }));
    }

    #[tokio::test]
    async fn optional_lookup_maps_not_found_to_none() {
        let resolver = SecretResolver::new(Arc::new(MissingProvider), fast_retry());
        assert!(resolver.get_optional_string("k").await.unwrap().is_none());

        let resolver = SecretResolver::new(FlakyProvider::new(0, b"kid-1"), fast_retry());
        let value = resolver.get_optional_string("k").await.unwrap().unwrap();
        assert_eq!(value.expose_secret(), "kid-1");
    }
}
