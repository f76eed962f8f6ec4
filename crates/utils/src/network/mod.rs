//! Network-related utilities.
//!
//! This module provides tools for managing network interactions, including
//! rate limiting to protect services from bursts and retry logic to handle
//! transient failures of remote collaborators.
//!
//! ## Key Components
//!
//! - **`rate_limit`**: Per-key sliding-window admission control with
//!   exemptions and background compaction.
//! - **`retry`**: Exponential backoff retry bounded by an overall deadline and
//!   a cancellation token.

pub mod rate_limit;
pub mod retry;

pub use rate_limit::{RateDecision, RateLimitConfig, RateLimiter};
pub use retry::{deadline_after, retry_with_deadline, RetryConfig};
