//! RSA key ring for signing and verification.

use std::collections::{HashMap, HashSet};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::TokenError;

struct ActiveKey {
    kid: String,
    encoding: EncodingKey,
}

/// Signing key plus every public key that verification still accepts.
///
/// Key generations are told apart by `kid`. A ring is built completely before
/// it is installed in a [`warden_core::KeyHandle`]; it is never mutated
/// afterwards.
pub struct TokenKeyRing {
    active: Option<ActiveKey>,
    verification: HashMap<String, DecodingKey>,
}

impl core::fmt::Debug for TokenKeyRing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenKeyRing")
            .field("active_kid", &self.active_kid())
            .field("verification_kids", &self.kids())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct PairCheck {
    kid: String,
}

impl TokenKeyRing {
    /// A ring with no keys: issuance fails with `KeyNotInitialized`,
    /// verification fails with `UnknownKeyId`.
    pub fn empty() -> Self {
        Self {
            active: None,
            verification: HashMap::new(),
        }
    }

    /// Build a ring from a PEM key pair.
    ///
    /// The pair is checked by signing a throwaway token with the private key and
    /// verifying it with the public key; a pair that does not belong together
    /// is `KeyMismatch`.
    pub fn from_pem(kid: &str, private_pem: &[u8], public_pem: &[u8]) -> Result<Self, TokenError> {
        let kid = validate_kid(kid)?;
        let encoding =
            EncodingKey::from_rsa_pem(private_pem).map_err(|_| TokenError::InvalidKey(kid.clone()))?;
        let decoding =
            DecodingKey::from_rsa_pem(public_pem).map_err(|_| TokenError::InvalidKey(kid.clone()))?;

        check_pair(&kid, &encoding, &decoding)?;
        debug!(kid = %kid, "loaded signing key pair");

        let mut verification = HashMap::new();
        verification.insert(kid.clone(), decoding);
        Ok(Self {
            active: Some(ActiveKey { kid, encoding }),
            verification,
        })
    }

    /// Accept tokens signed by another key generation (verification only).
    pub fn with_verification_key(mut self, kid: &str, public_pem: &[u8]) -> Result<Self, TokenError> {
        let kid = validate_kid(kid)?;
        if self.verification.contains_key(&kid) {
            return Err(TokenError::InvalidInput(format!("duplicate key id '{kid}'")));
        }
        let decoding =
            DecodingKey::from_rsa_pem(public_pem).map_err(|_| TokenError::InvalidKey(kid.clone()))?;
        debug!(kid = %kid, "added verification key");
        self.verification.insert(kid, decoding);
        Ok(self)
    }

    pub fn active_kid(&self) -> Option<&str> {
        self.active.as_ref().map(|k| k.kid.as_str())
    }

    /// Key ids accepted for verification, sorted.
    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.verification.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }

    pub(crate) fn signing_key(&self) -> Result<(&str, &EncodingKey), TokenError> {
        self.active
            .as_ref()
            .map(|k| (k.kid.as_str(), &k.encoding))
            .ok_or(TokenError::KeyNotInitialized)
    }

    pub(crate) fn decoding_key(&self, kid: &str) -> Option<&DecodingKey> {
        self.verification.get(kid)
    }
}

impl Default for TokenKeyRing {
    fn default() -> Self {
        Self::empty()
    }
}

fn validate_kid(kid: &str) -> Result<String, TokenError> {
    warden_core::require_non_blank("kid", kid)?;
    Ok(kid.trim().to_string())
}

/// Signature-only validation (no claim checks) for the key-pair check.
fn pair_check_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

fn check_pair(kid: &str, encoding: &EncodingKey, decoding: &DecodingKey) -> Result<(), TokenError> {
    let claims = PairCheck {
        kid: kid.to_string(),
    };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, encoding)
        .map_err(|_| TokenError::InvalidKey(kid.to_string()))?;

    jsonwebtoken::decode::<PairCheck>(&token, decoding, &pair_check_validation())
        .map(|_| ())
        .map_err(|_| TokenError::KeyMismatch(kid.to_string()))
}
