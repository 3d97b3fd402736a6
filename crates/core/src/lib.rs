//! `warden-core`: shared primitives for the credential & policy engine.
//!
//! This crate contains no cryptography and no IO: identifiers, the validation
//! error model, and the swappable key handle used by the signing services.

pub mod error;
pub mod id;
pub mod key_handle;

pub use error::{DomainError, DomainResult, require_non_blank};
pub use id::TenantId;
pub use key_handle::KeyHandle;
