//! TTL cache implementation
//!
//! - **`types`**: `TtlCache` handle, shared inner state, entries
//! - **`operations`**: get/set/delete/clear and statistics
//! - **`cleanup`**: background sweeper wiring

mod cleanup;
mod operations;
mod types;

#[cfg(test)]
mod tests;

pub use types::TtlCache;
