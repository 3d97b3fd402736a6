//! Credential claims.
//!
//! Inside the engine claims are a closed structure: the standard envelope plus
//! a tagged [`ClaimKind`]. The flat [`WireClaims`] map exists only at the
//! token boundary (encode/decode).

use serde::{Deserialize, Serialize};

use crate::TokenError;

/// Declared credential type (`token_type` claim).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    #[serde(rename = "id")]
    Identity,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Identity => "id",
            TokenType::Refresh => "refresh",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "access" => Some(TokenType::Access),
            "id" => Some(TokenType::Identity),
            "refresh" => Some(TokenType::Refresh),
            _ => None,
        }
    }
}

impl core::fmt::Display for TokenType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims every credential carries. Times are Unix seconds, UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardClaims {
    /// Subject / principal identifier.
    pub sub: String,
    /// Client the credential was issued to.
    pub aud: String,
    /// Tenant-scoped authority URL.
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    /// Unique token identifier (replay / revocation marker).
    pub jti: String,
}

/// User-profile claims carried by identity tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Type-specific claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimKind {
    Access { scope: String },
    Identity { profile: Profile, nonce: Option<String> },
    Refresh,
}

impl ClaimKind {
    pub fn token_type(&self) -> TokenType {
        match self {
            ClaimKind::Access { .. } => TokenType::Access,
            ClaimKind::Identity { .. } => TokenType::Identity,
            ClaimKind::Refresh => TokenType::Refresh,
        }
    }
}

/// Verified (or to-be-signed) claim set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub standard: StandardClaims,
    pub kind: ClaimKind,
}

impl TokenClaims {
    pub fn token_type(&self) -> TokenType {
        self.kind.token_type()
    }

    /// Access scope, if this is an access token.
    pub fn scope(&self) -> Option<&str> {
        match &self.kind {
            ClaimKind::Access { scope } => Some(scope),
            _ => None,
        }
    }

    /// Space-separated scope values of an access token.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope().unwrap_or_default().split_whitespace()
    }

    /// Lowers the closed structure to the flat wire map.
    pub fn to_wire(&self) -> WireClaims {
        let s = &self.standard;
        let mut wire = WireClaims {
            sub: Some(s.sub.clone()),
            aud: Some(s.aud.clone()),
            iss: Some(s.iss.clone()),
            iat: Some(s.iat),
            nbf: Some(s.nbf),
            exp: Some(s.exp),
            jti: Some(s.jti.clone()),
            token_type: Some(self.token_type().as_str().to_string()),
            ..WireClaims::default()
        };
        match &self.kind {
            ClaimKind::Access { scope } => wire.scope = Some(scope.clone()),
            ClaimKind::Identity { profile, nonce } => {
                wire.profile = profile.clone();
                wire.nonce = nonce.clone();
            }
            ClaimKind::Refresh => {}
        }
        wire
    }

    /// Lifts a decoded wire map into the closed structure.
    ///
    /// Required: non-empty `sub`, `aud`, `iss`, `jti`; present `iat`, `exp`;
    /// a known `token_type`; `scope` for access tokens. `nbf` defaults to `iat`.
    pub fn from_wire(wire: WireClaims) -> Result<Self, TokenError> {
        let sub = required_str(wire.sub, "sub")?;
        let aud = required_str(wire.aud, "aud")?;
        let iss = required_str(wire.iss, "iss")?;
        let iat = wire.iat.ok_or(TokenError::MissingClaim("iat"))?;
        let exp = wire.exp.ok_or(TokenError::MissingClaim("exp"))?;
        let jti = required_str(wire.jti, "jti")?;
        let nbf = wire.nbf.unwrap_or(iat);

        let token_type = wire.token_type.ok_or(TokenError::MissingClaim("token_type"))?;
        let token_type = TokenType::parse(&token_type).ok_or(TokenError::MalformedToken)?;

        let kind = match token_type {
            TokenType::Access => ClaimKind::Access {
                scope: required_str(wire.scope, "scope")?,
            },
            TokenType::Identity => ClaimKind::Identity {
                profile: wire.profile,
                nonce: wire.nonce.filter(|n| !n.is_empty()),
            },
            TokenType::Refresh => ClaimKind::Refresh,
        };

        Ok(Self {
            standard: StandardClaims {
                sub,
                aud,
                iss,
                iat,
                nbf,
                exp,
                jti,
            },
            kind,
        })
    }
}

fn required_str(value: Option<String>, claim: &'static str) -> Result<String, TokenError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TokenError::MissingClaim(claim)),
    }
}

/// Flat JWT payload as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(flatten)]
    pub profile: Profile,
}
