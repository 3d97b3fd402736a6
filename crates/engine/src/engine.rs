//! Bootstrap and reload of the credential services.

use secrecy::ExposeSecret;
use tracing::{info, warn};

use warden_core::KeyHandle;
use warden_links::{LinkKey, SignedLinkService};
use warden_secrets::{SecretError, SecretResolver};
use warden_tokens::{TokenKeyRing, TokenService};

use crate::config::secret_names as names;
use crate::{EngineConfig, EngineError};

/// HMAC keys shorter than this still work but are flagged at load time.
const RECOMMENDED_LINK_KEY_BYTES: usize = 32;

/// Token and link services sharing one secret resolver.
///
/// Cheap to clone; clones observe the same key handles, so a reload through
/// any clone is visible to all of them.
#[derive(Debug, Clone)]
pub struct CredentialEngine {
    resolver: SecretResolver,
    tokens: TokenService,
    links: SignedLinkService,
}

/// Which key generations are live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub active_kid: Option<String>,
    pub verification_kids: Vec<String>,
    pub token_generation: u64,
    pub link_generation: u64,
}

struct KeyMaterial {
    ring: TokenKeyRing,
    link_key: LinkKey,
}

impl CredentialEngine {
    /// Resolve every secret and build the services.
    ///
    /// Fails rather than starting without key material.
    pub async fn bootstrap(config: EngineConfig) -> Result<Self, EngineError> {
        let resolver = config.secrets.resolver()?;
        info!(backend = resolver.backend(), "loading key material");

        let material = load_material(&resolver).await?;
        let tokens = TokenService::new(KeyHandle::new(material.ring), config.ttls)
            .with_clock_skew(config.clock_skew);
        let links = SignedLinkService::new(KeyHandle::new(material.link_key));

        let engine = Self {
            resolver,
            tokens,
            links,
        };
        let status = engine.status();
        info!(
            active_kid = ?status.active_kid,
            verification_kids = ?status.verification_kids,
            "credential engine ready"
        );
        Ok(engine)
    }

    /// Re-resolve every secret and swap both key handles.
    ///
    /// Nothing is swapped unless all material resolves and validates, so a
    /// failed reload leaves the current keys serving.
    pub async fn reload(&self) -> Result<KeyStatus, EngineError> {
        let material = load_material(&self.resolver).await?;
        self.tokens.keys().swap(material.ring);
        self.links.key().swap(material.link_key);

        let status = self.status();
        info!(
            active_kid = ?status.active_kid,
            verification_kids = ?status.verification_kids,
            generation = status.token_generation,
            "key material reloaded"
        );
        Ok(status)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn links(&self) -> &SignedLinkService {
        &self.links
    }

    pub fn status(&self) -> KeyStatus {
        let ring = self.tokens.keys().load();
        KeyStatus {
            active_kid: ring.active_kid().map(str::to_string),
            verification_kids: ring.kids().into_iter().map(str::to_string).collect(),
            token_generation: self.tokens.keys().generation(),
            link_generation: self.links.key().generation(),
        }
    }
}

async fn load_material(resolver: &SecretResolver) -> Result<KeyMaterial, EngineError> {
    let private_pem = resolver.get_secret(names::JWT_PRIVATE_KEY).await?;
    let public_pem = resolver.get_secret(names::JWT_PUBLIC_KEY).await?;
    let kid = resolver.get_secret_string(names::JWT_KEY_ID).await?;

    let mut ring = TokenKeyRing::from_pem(
        key_id(names::JWT_KEY_ID, kid.expose_secret())?,
        private_pem.expose_secret(),
        public_pem.expose_secret(),
    )?;

    let previous_kid = resolver.get_optional_string(names::JWT_PREVIOUS_KEY_ID).await?;
    let previous_pem = resolver.get_optional_string(names::JWT_PREVIOUS_PUBLIC_KEY).await?;
    match (previous_kid, previous_pem) {
        (Some(kid), Some(pem)) => {
            ring = ring.with_verification_key(
                key_id(names::JWT_PREVIOUS_KEY_ID, kid.expose_secret())?,
                pem.expose_secret().as_bytes(),
            )?;
        }
        (None, None) => {}
        _ => {
            return Err(EngineError::config(format!(
                "{} and {} must be provided together",
                names::JWT_PREVIOUS_KEY_ID,
                names::JWT_PREVIOUS_PUBLIC_KEY
            )));
        }
    }

    let link_secret = resolver.get_secret(names::LINK_SIGNING_KEY).await?;
    if link_secret.expose_secret().len() < RECOMMENDED_LINK_KEY_BYTES {
        warn!(
            secret = names::LINK_SIGNING_KEY,
            min_bytes = RECOMMENDED_LINK_KEY_BYTES,
            "link signing key is shorter than recommended"
        );
    }

    Ok(KeyMaterial {
        ring,
        link_key: LinkKey::new(link_secret),
    })
}

/// Key ids travel in JWT headers; surrounding whitespace from files is dropped.
fn key_id<'a>(name: &str, raw: &'a str) -> Result<&'a str, EngineError> {
    let kid = raw.trim();
    if kid.is_empty() {
        return Err(SecretError::EmptySecret {
            name: name.to_string(),
        }
        .into());
    }
    Ok(kid)
}
