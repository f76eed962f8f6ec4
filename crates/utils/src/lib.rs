//! Shared utilities for keeper
//!
//! This crate provides the low-level building blocks used throughout the
//! keeper workspace: crash-safe file writes, owned background tasks, the
//! sliding-window rate limiter, deadline-bounded retry, and tracing setup.

pub mod atomic_file;
pub mod background;
pub mod network;
pub mod tracing;

pub use atomic_file::*;
pub use background::*;
pub use network::*;
