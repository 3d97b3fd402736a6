//! `warden-links`: stateless, expiring, tamper-evident URLs.
//!
//! A link's parameters plus an `expires` timestamp are signed with
//! HMAC-SHA256 over a canonical (sorted) form; the signature travels as the
//! `sig` parameter. Nothing is stored server-side. Single-use semantics belong
//! to whoever owns the referenced resource (an invite's `used_at`, a reset
//! token's consumption), not to this crate.

pub mod canonical;
pub mod error;
pub mod purpose;
pub mod service;

pub use error::{LinkError, LinkFailure};
pub use purpose::LinkPurpose;
pub use service::{LinkKey, SignedLinkService};

/// Query parameter carrying the expiry (Unix seconds).
pub const EXPIRES_PARAM: &str = "expires";
/// Query parameter carrying the signature.
pub const SIG_PARAM: &str = "sig";
