//! HashiCorp Vault KV v2 backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::SecretError;
use crate::config::VaultConfig;
use crate::provider::{SecretProvider, decode_payload, validate_name};

/// Field inside the KV entry that carries the secret value.
const VALUE_FIELD: &str = "value";

/// Vault KV response envelope: `{"data":{"data":{"value":"..."}}}`.
#[derive(Debug, Deserialize)]
struct VaultKvResponse {
    #[serde(default)]
    data: VaultKvData,
}

#[derive(Debug, Deserialize, Default)]
struct VaultKvData {
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

/// Reads `GET {addr}/v1/{mount}/data/{name}` with an `X-Vault-Token` header.
#[derive(Debug)]
pub struct VaultProvider {
    addr: String,
    mount: String,
    token: SecretString,
    http: Client,
}

impl VaultProvider {
    pub fn new(config: &VaultConfig) -> Result<Self, SecretError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SecretError::Misconfigured {
                backend: "vault",
                reason: format!("creating HTTP client: {e}"),
            })?;

        Ok(Self {
            addr: config.addr.trim_end_matches('/').to_string(),
            mount: config.mount.trim_matches('/').to_string(),
            token: SecretString::from(config.token.expose_secret().to_owned()),
            http,
        })
    }

    fn entry_url(&self, name: &str) -> String {
        format!("{}/v1/{}/data/{}", self.addr, self.mount, name)
    }
}

/// Extract the value field from a KV v2 response body.
fn extract_value(name: &str, body: &str) -> Result<Vec<u8>, SecretError> {
    let parsed: VaultKvResponse =
        serde_json::from_str(body).map_err(|e| SecretError::Unavailable {
            backend: "vault",
            reason: format!("parsing response: {e}"),
        })?;

    match parsed.data.data.get(VALUE_FIELD) {
        Some(serde_json::Value::String(s)) => decode_payload(name, s.clone().into_bytes()),
        Some(_) => Err(SecretError::InvalidEncoding {
            name: name.to_string(),
            expected: "string",
        }),
        None => Err(SecretError::NotFound {
            backend: "vault",
            name: name.to_string(),
        }),
    }
}

#[async_trait]
impl SecretProvider for VaultProvider {
    fn name(&self) -> &'static str {
        "vault"
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SecretError> {
        validate_name(name)?;
        let url = self.entry_url(name);
        debug!(secret = name, "fetching secret from vault");

        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", self.token.expose_secret())
            .send()
            .await
            .map_err(|e| SecretError::Unavailable {
                backend: "vault",
                reason: format!("sending request: {e}"),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SecretError::NotFound {
                backend: "vault",
                name: name.to_string(),
            });
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SecretError::Unavailable {
                backend: "vault",
                reason: format!("status {status}"),
            });
        }
        if !status.is_success() {
            return Err(SecretError::Rejected {
                backend: "vault",
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SecretError::Unavailable {
            backend: "vault",
            reason: format!("reading response: {e}"),
        })?;
        extract_value(name, &body)
    }
}
