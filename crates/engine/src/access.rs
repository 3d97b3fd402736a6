//! Request-level authenticate-then-authorize check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use warden_auth::{Decision, Principal, authorize};
use warden_tokens::{AuthFailure, TokenClaims};

use crate::{CredentialEngine, EngineError};

/// Data-layer collaborator: turns verified claims into a principal with its
/// permission strings and policy documents.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// `Ok(None)` when the subject no longer exists (deleted, suspended).
    async fn resolve(&self, claims: &TokenClaims) -> Result<Option<Principal>, EngineError>;
}

/// What a request handler acts on. Verification detail stays in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Allowed(Principal),
    Unauthenticated,
    Forbidden,
}

impl AccessOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessOutcome::Allowed(_))
    }
}

impl CredentialEngine {
    /// Verify a bearer access token, resolve its principal and authorize
    /// `action` on `resource`.
    ///
    /// Every token verification failure is `Unauthenticated`. `Err` is kept for
    /// faults the caller cannot fix by presenting another credential: missing
    /// key material or a failing principal lookup.
    pub async fn check_access<R>(
        &self,
        bearer: &str,
        action: &str,
        resource: &str,
        resolver: &R,
        now: DateTime<Utc>,
    ) -> Result<AccessOutcome, EngineError>
    where
        R: PrincipalResolver + ?Sized,
    {
        let claims = match self.tokens().validate_access_token(bearer, now) {
            Ok(claims) => claims,
            Err(err) => {
                if err.to_public() == AuthFailure::Misconfigured {
                    return Err(err.into());
                }
                debug!(reason = %err, "bearer token rejected");
                return Ok(AccessOutcome::Unauthenticated);
            }
        };

        let Some(principal) = resolver.resolve(&claims).await? else {
            debug!(sub = %claims.standard.sub, "token subject did not resolve to a principal");
            return Ok(AccessOutcome::Unauthenticated);
        };

        Ok(match authorize(&principal, action, resource) {
            Decision::Allow => AccessOutcome::Allowed(principal),
            Decision::Deny => AccessOutcome::Forbidden,
        })
    }
}
