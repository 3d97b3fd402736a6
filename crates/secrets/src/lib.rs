//! `warden-secrets`: named secret resolution from one configured backend.
//!
//! Backends implement [`SecretProvider`]; the [`SecretResolver`] adds the
//! bounded retry and the empty-value guard on top. Resolution happens at
//! process start or on an explicit reload, never per request.

pub mod config;
pub mod env;
pub mod error;
pub mod file;
pub mod provider;
pub mod remote;
pub mod resolver;
pub mod vault;

pub use config::{SecretBackend, SecretsConfig, VaultConfig};
pub use env::EnvProvider;
pub use error::SecretError;
pub use file::FileProvider;
pub use provider::SecretProvider;
pub use remote::RemoteProvider;
pub use resolver::{RetryPolicy, SecretResolver};
pub use vault::VaultProvider;
