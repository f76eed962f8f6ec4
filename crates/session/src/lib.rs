//! Resilient session validation for keeper
//!
//! [`SessionValidator`] composes the workspace building blocks into one
//! request path: per-device rate limiting, the TTL result cache, remote
//! introspection with bounded retries, and the encrypted offline record.
//!
//! The identity provider and account store are injected through the
//! [`IdentityProvider`] and [`AccountDirectory`] traits. Trusted principals
//! are applied after validation with [`TrustedPrincipals::elevate`].

pub mod config;
pub mod provider;
pub mod trusted;
pub mod validator;

pub use config::ValidatorConfig;
pub use provider::{AccountDirectory, IdentityProvider, RemoteIdentity};
pub use trusted::TrustedPrincipals;
pub use validator::SessionValidator;
