use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use warden_core::TenantId;

use crate::permissions::split_pattern;
use crate::policy::{Effect, PolicyDocument};
use crate::{Principal, PrincipalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

/// Outcome of the policy-document layer on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVerdict {
    Allow,
    Deny,
    /// No statement fired.
    Silent,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: '{action}' on '{resource}'")]
    Forbidden { action: String, resource: String },
}

/// `(action, resource)` turned into the concrete values patterns match against.
struct Request<'a> {
    family: &'a str,
    action: &'a str,
    concrete_action: String,
    concrete_resource: String,
}

impl<'a> Request<'a> {
    /// `resource` is a bare family (`doc`, read as `doc:*`) or `family:name`.
    fn new(action: &'a str, resource: &'a str) -> Option<Self> {
        let (family, name) = if resource.contains(':') {
            split_pattern(resource)?
        } else {
            (resource, "*")
        };
        if family.is_empty() || action.is_empty() || action.contains(':') {
            return None;
        }
        Some(Self {
            family,
            action,
            concrete_action: format!("{family}:{action}"),
            concrete_resource: format!("{family}:{name}"),
        })
    }
}

/// Evaluate every statement of every document. Deny wins and short-circuits.
pub fn evaluate_policies(
    documents: &[PolicyDocument],
    concrete_action: &str,
    concrete_resource: &str,
) -> PolicyVerdict {
    let mut allowed = false;
    for document in documents {
        for (_, statement) in document.firing(concrete_action, concrete_resource) {
            match statement.effect {
                Effect::Deny => return PolicyVerdict::Deny,
                Effect::Allow => allowed = true,
            }
        }
    }
    if allowed {
        PolicyVerdict::Allow
    } else {
        PolicyVerdict::Silent
    }
}

/// Decide whether `principal` may perform `action` on `resource`.
///
/// ALLOW iff (a flat permission grants it OR a policy statement allows it)
/// AND no policy statement denies it. Malformed requests are denied.
///
/// - No IO
/// - No panics
/// - Deterministic
pub fn authorize(principal: &Principal, action: &str, resource: &str) -> Decision {
    let Some(request) = Request::new(action, resource) else {
        debug!(action, resource, "malformed authorization request");
        return Decision::Deny;
    };

    let verdict = evaluate_policies(
        &principal.policies,
        &request.concrete_action,
        &request.concrete_resource,
    );
    let decision = match verdict {
        PolicyVerdict::Deny => Decision::Deny,
        PolicyVerdict::Allow => Decision::Allow,
        PolicyVerdict::Silent if flat_allows(principal, &request) => Decision::Allow,
        PolicyVerdict::Silent => Decision::Deny,
    };

    debug!(
        principal_id = %principal.principal_id,
        action = %request.concrete_action,
        resource = %request.concrete_resource,
        ?verdict,
        ?decision,
        "authorization decided"
    );
    decision
}

/// [`authorize`] inside a tenant context, as a `Result` for `?` at the
/// command boundary.
pub fn require(
    principal: &Principal,
    tenant_id: TenantId,
    action: &str,
    resource: &str,
) -> Result<(), AuthzError> {
    if principal.tenant_id != tenant_id {
        return Err(AuthzError::TenantMismatch);
    }
    match authorize(principal, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AuthzError::Forbidden {
            action: action.to_string(),
            resource: resource.to_string(),
        }),
    }
}

fn flat_allows(principal: &Principal, request: &Request<'_>) -> bool {
    principal
        .permissions
        .iter()
        .any(|p| p.grants(request.family, request.action))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Always agrees with [`authorize`] for the same inputs.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: String,
    pub resource: String,
    pub decision: Decision,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub principal: PrincipalState,

    /// First permission that grants the request, if any.
    pub granted_by: Option<String>,

    pub policy_verdict: PolicyVerdict,

    /// Every statement that fired, in evaluation order.
    pub firing_statements: Vec<FiringStatement>,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: PrincipalId,
    pub tenant_id: TenantId,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
    pub policy_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiringStatement {
    pub document: usize,
    pub version: String,
    pub statement: usize,
    pub effect: Effect,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    MalformedRequest,
    ExplicitDeny,
    MissingPermission,
}

/// Explain why an authorization decision was made (or would be made).
///
/// Unlike [`authorize`] this does not stop at the first deny: every firing
/// statement is reported.
pub fn explain_authorization(
    principal: &Principal,
    action: &str,
    resource: &str,
) -> AuthorizationExplanation {
    let mut effective_permissions: Vec<String> = principal
        .permissions
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    effective_permissions.sort();

    let state = PrincipalState {
        principal_id: principal.principal_id,
        tenant_id: principal.tenant_id,
        roles: principal.roles.iter().map(|r| r.as_str().to_string()).collect(),
        effective_permissions,
        policy_count: principal.policies.len(),
    };

    let Some(request) = Request::new(action, resource) else {
        return AuthorizationExplanation {
            action: action.to_string(),
            resource: resource.to_string(),
            decision: Decision::Deny,
            reason: format!("Request '{action}' on '{resource}' is not of the form action + family[:name]"),
            principal: state,
            granted_by: None,
            policy_verdict: PolicyVerdict::Silent,
            firing_statements: Vec::new(),
            denial_reason: Some(DenialReason {
                kind: DenialKind::MalformedRequest,
                message: "Malformed action or resource".to_string(),
                suggestions: vec![
                    "Use a bare action (e.g. 'read') and a resource of the form 'family' or 'family:name'"
                        .to_string(),
                ],
            }),
        };
    };

    let mut firing_statements = Vec::new();
    for (doc_index, document) in principal.policies.iter().enumerate() {
        for (statement_index, statement) in
            document.firing(&request.concrete_action, &request.concrete_resource)
        {
            firing_statements.push(FiringStatement {
                document: doc_index,
                version: document.version.clone(),
                statement: statement_index,
                effect: statement.effect,
            });
        }
    }

    let policy_verdict = if firing_statements.iter().any(|s| s.effect == Effect::Deny) {
        PolicyVerdict::Deny
    } else if firing_statements.is_empty() {
        PolicyVerdict::Silent
    } else {
        PolicyVerdict::Allow
    };

    let granted_by = principal
        .permissions
        .iter()
        .find(|p| p.grants(request.family, request.action))
        .map(|p| p.as_str().to_string());

    let concrete_action = request.concrete_action.clone();
    let concrete_resource = request.concrete_resource.clone();

    let (decision, reason, denial_reason) = match (policy_verdict, &granted_by) {
        (PolicyVerdict::Deny, _) => {
            let first = firing_statements
                .iter()
                .find(|s| s.effect == Effect::Deny)
                .map(|s| format!("document[{}] statement[{}]", s.document, s.statement))
                .unwrap_or_default();
            (
                Decision::Deny,
                format!("Explicit deny in {first}"),
                Some(DenialReason {
                    kind: DenialKind::ExplicitDeny,
                    message: format!(
                        "A policy statement denies '{concrete_action}' on '{concrete_resource}'; permissions cannot override it"
                    ),
                    suggestions: vec![
                        format!("Review the deny statement in {first}"),
                        "Detach the policy document from the principal if the deny is unintended".to_string(),
                    ],
                }),
            )
        }
        (PolicyVerdict::Allow, _) => (
            Decision::Allow,
            format!("Policy statement allows '{concrete_action}' on '{concrete_resource}'"),
            None,
        ),
        (PolicyVerdict::Silent, Some(permission)) => (
            Decision::Allow,
            format!("Principal has permission '{permission}'"),
            None,
        ),
        (PolicyVerdict::Silent, None) => (
            Decision::Deny,
            format!(
                "No permission or policy statement grants '{concrete_action}' on '{concrete_resource}'"
            ),
            Some(DenialReason {
                kind: DenialKind::MissingPermission,
                message: format!("Missing permission '{concrete_action}'"),
                suggestions: vec![
                    format!(
                        "Assign a role that grants '{concrete_action}' or '{}:*'",
                        request.family
                    ),
                    format!("Attach a policy allowing '{concrete_action}' on '{concrete_resource}'"),
                ],
            }),
        ),
    };

    AuthorizationExplanation {
        action: concrete_action,
        resource: concrete_resource,
        decision,
        reason,
        principal: state,
        granted_by,
        policy_verdict,
        firing_statements,
        denial_reason,
    }
}
