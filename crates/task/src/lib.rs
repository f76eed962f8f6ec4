//! Bounded worker pool for keeper
//!
//! Caps how much expensive work (transcription calls, large uploads) runs at
//! once, independent of how many inbound requests arrive. A fixed set of
//! workers pull jobs from a bounded queue; a full queue rejects new work
//! immediately with [`Error::QueueFull`](keeper_core::Error::QueueFull).
//!
//! Each job runs in its own tokio task so a panic inside the work is reported
//! as [`Error::JobFailed`](keeper_core::Error::JobFailed) instead of taking the
//! worker down. When a job exceeds its deadline the caller gets
//! [`Error::JobTimeout`](keeper_core::Error::JobTimeout), the job's
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is triggered and
//! the worker moves on. Work that ignores the token keeps running detached
//! until it finishes on its own; it is never forcibly killed.

pub mod config;
pub mod job;
pub mod pool;
pub mod stats;

pub use config::PoolConfig;
pub use job::JobContext;
pub use pool::WorkerPool;
pub use stats::PoolStatistics;
