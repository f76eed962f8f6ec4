//! Core domain types, errors, and constants for `keeper`.
//!
//! This crate establishes the foundational data structures and error handling
//! used by every other crate in the workspace.
//!
//! ## Key Components
//!
//! - **`errors`**: The workspace `Error` enum and `Result` alias. Every failure
//!   mode of the cache, rate limiter, worker pool, session store and validator
//!   is one of its variants.
//! - **`types`**: Session snapshots, the tri-state `ValidationResult`, and
//!   newtype wrappers for credentials and device identifiers.
//! - **`constants`**: Shared defaults such as the session file name and cache
//!   key prefixes.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
