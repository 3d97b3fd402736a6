//! `warden-auth`: pure authorization boundary.
//!
//! Decides ALLOW or DENY for `(principal, action, resource)` from the
//! principal's flat permission strings and attached policy documents. A deny
//! statement in any document is absolute. No I/O, no clocks, no storage.

pub mod authorize;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, Decision, PolicyVerdict, authorize, evaluate_policies,
    explain_authorization, require,
};
pub use permissions::{Permission, matches_pattern};
pub use policy::{Effect, PolicyDocument, PolicyDocumentError, Statement};
pub use principal::{Principal, PrincipalId};
pub use roles::Role;
