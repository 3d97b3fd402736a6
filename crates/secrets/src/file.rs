//! File backend for mounted secret volumes.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::SecretError;
use crate::provider::{SecretProvider, decode_payload, validate_name};

/// Reads one file per secret from a directory (e.g. `/run/secrets`).
///
/// A single trailing newline is stripped; `base64:` payloads are decoded.
#[derive(Debug, Clone)]
pub struct FileProvider {
    dir: PathBuf,
}

impl FileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl SecretProvider for FileProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SecretError> {
        validate_name(name)?;
        let path = self.dir.join(name);
        let mut raw = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SecretError::NotFound {
                    backend: "file",
                    name: name.to_string(),
                });
            }
            Err(e) => {
                return Err(SecretError::Unavailable {
                    backend: "file",
                    reason: format!("reading {}: {}", path.display(), e.kind()),
                });
            }
        };

        if raw.ends_with(b"\n") {
            raw.pop();
            if raw.ends_with(b"\r") {
                raw.pop();
            }
        }
        decode_payload(name, raw)
    }
}
