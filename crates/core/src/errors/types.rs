//! Core error type definitions

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for keeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for keeper operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rate limit exceeded for a key; recoverable by waiting
    #[error("rate limit exceeded for '{key}', retry after {retry_after:?}")]
    Throttled { key: String, retry_after: Duration },

    /// Network or timeout failure talking to the identity provider
    #[error("identity provider '{endpoint}' unavailable: {message}")]
    RemoteUnavailable { endpoint: String, message: String },

    /// The identity provider definitively rejected the credential
    #[error("credential rejected: {reason}")]
    RemoteRejected { reason: String },

    /// On-disk session blob failed to decrypt or parse
    #[error("corrupt session at '{path}': {reason}")]
    CorruptSession { path: PathBuf, reason: String },

    /// Worker pool queue is saturated
    #[error("job queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// A pool job exceeded its execution deadline
    #[error("job '{job_id}' timed out after {deadline:?}")]
    JobTimeout { job_id: String, deadline: Duration },

    /// A pool job panicked or its task was torn down
    #[error("job '{job_id}' failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// The worker pool has been shut down
    #[error("worker pool is shut down")]
    PoolClosed,

    /// An operation was cancelled by its caller
    #[error("operation '{operation}' was cancelled")]
    Cancelled { operation: String },

    /// Key derivation or cipher failure
    #[error("cryptographic error: {message}")]
    Crypto { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },
}

impl Error {
    /// Whether the failure is transient and worth another attempt.
    ///
    /// `RemoteRejected` is never retryable: retrying it would mask a real
    /// invalidation as a network blip.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;
        match self {
            Error::RemoteUnavailable { .. } | Error::Timeout { .. } => true,
            Error::FileSystem { source, .. } => matches!(
                source.kind(),
                ErrorKind::Interrupted
                    | ErrorKind::WouldBlock
                    | ErrorKind::TimedOut
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Whether the caller can usefully resubmit later (backpressure and deadlines)
    #[must_use]
    pub fn is_backpressure(&self) -> bool {
        matches!(
            self,
            Error::QueueFull { .. } | Error::JobTimeout { .. } | Error::Throttled { .. }
        )
    }
}
