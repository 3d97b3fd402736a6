//! Backend selection and secret-layer configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;

use crate::{
    EnvProvider, FileProvider, RemoteProvider, RetryPolicy, SecretError, SecretProvider,
    SecretResolver, VaultProvider,
};

pub const BACKEND_VAR: &str = "WARDEN_SECRET_BACKEND";
pub const PREFIX_VAR: &str = "WARDEN_SECRET_PREFIX";
pub const DIR_VAR: &str = "WARDEN_SECRET_DIR";
pub const VAULT_ADDR_VAR: &str = "VAULT_ADDR";
pub const VAULT_TOKEN_VAR: &str = "VAULT_TOKEN";
pub const VAULT_MOUNT_VAR: &str = "WARDEN_VAULT_MOUNT";
pub const RETRY_BACKOFF_VAR: &str = "WARDEN_SECRET_RETRY_BACKOFF_MS";

const DEFAULT_PREFIX: &str = "WARDEN_";
const DEFAULT_DIR: &str = "/run/secrets";
const DEFAULT_VAULT_MOUNT: &str = "secret";

/// Supported secret backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretBackend {
    Env,
    File,
    Vault,
    AwsSsm,
    AwsSecretsManager,
    GcpSecretManager,
}

impl SecretBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretBackend::Env => "env",
            SecretBackend::File => "file",
            SecretBackend::Vault => "vault",
            SecretBackend::AwsSsm => "aws-ssm",
            SecretBackend::AwsSecretsManager => "aws-secrets-manager",
            SecretBackend::GcpSecretManager => "gcp-secret-manager",
        }
    }

    /// Resolve a backend selector.
    ///
    /// No selector means `env`. An unknown selector also means `env`, with a
    /// warning; it never means "no secrets" or a built-in default key.
    pub fn parse(selector: Option<&str>) -> Self {
        let Some(raw) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
            return SecretBackend::Env;
        };

        match raw.to_ascii_lowercase().as_str() {
            "env" | "environment" => SecretBackend::Env,
            "file" | "files" => SecretBackend::File,
            "vault" => SecretBackend::Vault,
            "aws-ssm" | "ssm" => SecretBackend::AwsSsm,
            "aws-secrets-manager" | "secretsmanager" => SecretBackend::AwsSecretsManager,
            "gcp-secret-manager" | "gcp" => SecretBackend::GcpSecretManager,
            other => {
                warn!(backend = other, "unknown secret backend, falling back to env");
                SecretBackend::Env
            }
        }
    }
}

impl core::fmt::Display for SecretBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for the vault backend.
#[derive(Debug)]
pub struct VaultConfig {
    pub addr: String,
    pub token: SecretString,
    pub mount: String,
}

/// Secret-layer configuration, read once at startup.
#[derive(Debug)]
pub struct SecretsConfig {
    pub backend: SecretBackend,
    /// Variable-name prefix for the env backend.
    pub prefix: String,
    /// Directory for the file backend.
    pub dir: PathBuf,
    pub vault: Option<VaultConfig>,
    pub retry: RetryPolicy,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::Env,
            prefix: DEFAULT_PREFIX.to_string(),
            dir: PathBuf::from(DEFAULT_DIR),
            vault: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl SecretsConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = SecretBackend::parse(lookup(BACKEND_VAR).as_deref());
        let prefix = lookup(PREFIX_VAR).unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let dir = lookup(DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));

        let vault = match (lookup(VAULT_ADDR_VAR), lookup(VAULT_TOKEN_VAR)) {
            (Some(addr), Some(token)) => Some(VaultConfig {
                addr,
                token: SecretString::from(token),
                mount: lookup(VAULT_MOUNT_VAR).unwrap_or_else(|| DEFAULT_VAULT_MOUNT.to_string()),
            }),
            _ => None,
        };

        let mut retry = RetryPolicy::default();
        if let Some(ms) = lookup(RETRY_BACKOFF_VAR) {
            match ms.trim().parse::<u64>() {
                Ok(ms) => retry.backoff = Duration::from_millis(ms),
                Err(_) => warn!(value = %ms, "ignoring invalid {RETRY_BACKOFF_VAR}"),
            }
        }

        Self {
            backend,
            prefix,
            dir,
            vault,
            retry,
        }
    }

    /// Construct the provider for the selected backend.
    pub fn build_provider(&self) -> Result<Arc<dyn SecretProvider>, SecretError> {
        let provider: Arc<dyn SecretProvider> = match self.backend {
            SecretBackend::Env => Arc::new(EnvProvider::new(self.prefix.clone())),
            SecretBackend::File => Arc::new(FileProvider::new(self.dir.clone())),
            SecretBackend::Vault => {
                let vault = self.vault.as_ref().ok_or_else(|| SecretError::Misconfigured {
                    backend: "vault",
                    reason: format!("{VAULT_ADDR_VAR} and {VAULT_TOKEN_VAR} are required"),
                })?;
                Arc::new(VaultProvider::new(vault)?)
            }
            remote => Arc::new(RemoteProvider::new(remote)),
        };
        Ok(provider)
    }

    /// Construct a resolver over the selected backend.
    pub fn resolver(&self) -> Result<SecretResolver, SecretError> {
        Ok(SecretResolver::new(self.build_provider()?, self.retry))
    }
}
