//! Ambient plumbing shared by Schoolhub services.
//!
//! Error envelope, tracing bootstrap, env-backed configuration, request ids and
//! the liveness probe. No domain logic lives here.

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
