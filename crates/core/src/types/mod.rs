//! Core domain types for `keeper`.
//!
//! - **`identity`**: Credential and device identifier newtypes
//! - **`snapshot`**: Point-in-time user/subscription/usage snapshots and the
//!   persisted `SessionRecord`
//! - **`validation`**: The tri-state `ValidationResult`

pub mod identity;
pub mod snapshot;
pub mod validation;

pub use identity::*;
pub use snapshot::*;
pub use validation::*;
