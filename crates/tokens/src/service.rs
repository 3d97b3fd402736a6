//! Token issuance and verification.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;

use warden_core::{KeyHandle, require_non_blank};

use crate::claims::{ClaimKind, Profile, StandardClaims, TokenClaims, TokenType, WireClaims};
use crate::{TokenError, TokenKeyRing};

/// Bytes of CSPRNG output per token id.
const JTI_BYTES: usize = 16;

/// Fixed lifetimes per credential type, set once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    pub access: Duration,
    pub identity: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            identity: Duration::hours(1),
            refresh: Duration::days(30),
        }
    }
}

impl TokenTtls {
    pub fn for_type(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access,
            TokenType::Identity => self.identity,
            TokenType::Refresh => self.refresh,
        }
    }
}

/// Who a credential is about and who it is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenContext<'a> {
    pub subject: &'a str,
    /// Client identifier.
    pub audience: &'a str,
    /// Tenant-scoped authority URL.
    pub issuer: &'a str,
}

impl<'a> TokenContext<'a> {
    pub fn new(subject: &'a str, audience: &'a str, issuer: &'a str) -> Self {
        Self {
            subject,
            audience,
            issuer,
        }
    }

    fn validate(&self) -> Result<(), TokenError> {
        require_non_blank("subject", self.subject)?;
        require_non_blank("audience", self.audience)?;
        require_non_blank("issuer", self.issuer)?;
        Ok(())
    }
}

/// Result of a refresh exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub id_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Mints and verifies RS256 credentials against a swappable key ring.
#[derive(Debug, Clone)]
pub struct TokenService {
    keys: KeyHandle<TokenKeyRing>,
    ttls: TokenTtls,
    clock_skew: Duration,
}

impl TokenService {
    pub fn new(keys: KeyHandle<TokenKeyRing>, ttls: TokenTtls) -> Self {
        Self {
            keys,
            ttls,
            clock_skew: Duration::seconds(30),
        }
    }

    /// Tolerance applied to `nbf`/`iat` in the future.
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    pub fn keys(&self) -> &KeyHandle<TokenKeyRing> {
        &self.keys
    }

    pub fn ttls(&self) -> &TokenTtls {
        &self.ttls
    }

    // ─────────────────────────────────────────────────────────────────────
    // Issuance
    // ─────────────────────────────────────────────────────────────────────

    pub fn issue_access_token(
        &self,
        ctx: TokenContext<'_>,
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        require_non_blank("scope", scope)?;
        self.issue(
            ctx,
            ClaimKind::Access {
                scope: scope.to_string(),
            },
            now,
        )
    }

    pub fn issue_identity_token(
        &self,
        ctx: TokenContext<'_>,
        profile: &Profile,
        nonce: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if let Some(nonce) = nonce {
            require_non_blank("nonce", nonce)?;
        }
        self.issue(
            ctx,
            ClaimKind::Identity {
                profile: profile.clone(),
                nonce: nonce.map(str::to_string),
            },
            now,
        )
    }

    pub fn issue_refresh_token(
        &self,
        ctx: TokenContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.issue(ctx, ClaimKind::Refresh, now)
    }

    fn issue(
        &self,
        ctx: TokenContext<'_>,
        kind: ClaimKind,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        ctx.validate()?;

        let ring = self.keys.load();
        let (kid, encoding) = ring.signing_key()?;

        let iat = now.timestamp();
        let ttl = self.ttls.for_type(kind.token_type());
        let claims = TokenClaims {
            standard: StandardClaims {
                sub: ctx.subject.to_string(),
                aud: ctx.audience.to_string(),
                iss: ctx.issuer.to_string(),
                iat,
                nbf: iat,
                exp: iat + ttl.num_seconds(),
                jti: generate_jti(),
            },
            kind,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());

        let token = jsonwebtoken::encode(&header, &claims.to_wire(), encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(
            kid,
            token_type = %claims.token_type(),
            jti = %claims.standard.jti,
            "issued token"
        );
        Ok(token)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────

    /// Verify a credential of any type and return its claims.
    ///
    /// Order of checks: algorithm pinned to RS256, key by `kid`, signature,
    /// required claims, time window.
    pub fn validate_token(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let result = self.validate_inner(token, now);
        if let Err(err) = &result {
            debug!(reason = %err, "token rejected");
        }
        result
    }

    /// Verify a credential and require it to be an access token.
    pub fn validate_access_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        self.validate_typed(token, TokenType::Access, now)
    }

    /// Verify a credential and require it to be a refresh token.
    pub fn validate_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        self.validate_typed(token, TokenType::Refresh, now)
    }

    fn validate_typed(
        &self,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.validate_token(token, now)?;
        if claims.token_type() != expected {
            debug!(expected = %expected, actual = %claims.token_type(), "token type mismatch");
            return Err(TokenError::WrongTokenType {
                expected: expected.as_str(),
            });
        }
        Ok(claims)
    }

    fn validate_inner(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::MalformedToken);
        }

        let header = jsonwebtoken::decode_header(token).map_err(|_| TokenError::MalformedToken)?;
        if header.alg != Algorithm::RS256 {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let ring = self.keys.load();
        let kid = header.kid.as_deref().ok_or(TokenError::UnknownKeyId)?;
        let key = ring.decoding_key(kid).ok_or(TokenError::UnknownKeyId)?;

        let data = jsonwebtoken::decode::<WireClaims>(token, key, &signature_only_validation())
            .map_err(map_decode_error)?;

        let claims = TokenClaims::from_wire(data.claims)?;
        self.check_time_window(&claims.standard, now)?;
        Ok(claims)
    }

    /// Deterministic time-window checks against the caller's clock.
    fn check_time_window(&self, claims: &StandardClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
        let now = now.timestamp();
        let skew = self.clock_skew.num_seconds();

        if claims.exp <= claims.iat {
            return Err(TokenError::InvalidTimeWindow);
        }
        if now >= claims.exp {
            return Err(TokenError::ExpiredToken);
        }
        if claims.nbf > now + skew || claims.iat > now + skew {
            return Err(TokenError::NotYetValid);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Refresh exchange
    // ─────────────────────────────────────────────────────────────────────

    /// Trade a refresh token for a fresh access + identity pair for the same
    /// subject, audience and issuer.
    ///
    /// Revocation of the presented refresh token is the caller's concern.
    pub fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        scope: &str,
        profile: &Profile,
        nonce: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let claims = self.validate_refresh_token(refresh_token, now)?;
        let s = &claims.standard;
        let ctx = TokenContext::new(&s.sub, &s.aud, &s.iss);

        Ok(TokenPair {
            access_token: self.issue_access_token(ctx, scope, now)?,
            id_token: self.issue_identity_token(ctx, profile, nonce, now)?,
            expires_in: self.ttls.access.num_seconds(),
        })
    }
}

/// Signature and algorithm only; claim and time checks happen on the typed
/// claims against the caller-supplied clock.
fn signature_only_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnsupportedAlgorithm
        }
        ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        _ => TokenError::MalformedToken,
    }
}

fn generate_jti() -> String {
    let mut bytes = [0u8; JTI_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
