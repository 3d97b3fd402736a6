//! `warden-engine`: wires the credential services to their key material.
//!
//! Reads configuration once, resolves every secret before serving, and offers
//! the request-level authenticate-then-authorize check. Transport (HTTP, gRPC)
//! lives outside this crate.

pub mod access;
pub mod config;
pub mod engine;
pub mod error;

pub use access::{AccessOutcome, PrincipalResolver};
pub use config::{EngineConfig, secret_names};
pub use engine::{CredentialEngine, KeyStatus};
pub use error::EngineError;
