//! `warden-tokens`: issuance and verification of RS256-signed credentials.
//!
//! Three credential kinds share one envelope of standard claims:
//! access tokens (with a scope), identity tokens (with profile claims and an
//! optional nonce) and refresh tokens. Verification never trusts the header
//! beyond selecting a key: the algorithm is pinned to RS256.

pub mod claims;
pub mod error;
pub mod keys;
pub mod service;

pub use claims::{ClaimKind, Profile, StandardClaims, TokenClaims, TokenType, WireClaims};
pub use error::{AuthFailure, TokenError};
pub use keys::TokenKeyRing;
pub use service::{TokenContext, TokenPair, TokenService, TokenTtls};
