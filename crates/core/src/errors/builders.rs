//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;
use std::time::Duration;

impl Error {
    /// Create a throttling error with the remaining wait
    #[must_use]
    pub fn throttled(key: impl Into<String>, retry_after: Duration) -> Self {
        Error::Throttled {
            key: key.into(),
            retry_after,
        }
    }

    /// Create a transient identity-provider error
    #[must_use]
    pub fn remote_unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RemoteUnavailable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a definitive credential rejection
    #[must_use]
    pub fn remote_rejected(reason: impl Into<String>) -> Self {
        Error::RemoteRejected {
            reason: reason.into(),
        }
    }

    /// Create a corrupt-session error
    #[must_use]
    pub fn corrupt_session(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptSession {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a queue-full backpressure error
    #[must_use]
    pub fn queue_full(capacity: usize) -> Self {
        Error::QueueFull { capacity }
    }

    /// Create a job timeout error
    #[must_use]
    pub fn job_timeout(job_id: impl Into<String>, deadline: Duration) -> Self {
        Error::JobTimeout {
            job_id: job_id.into(),
            deadline,
        }
    }

    /// Create a job failure error
    #[must_use]
    pub fn job_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::JobFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a cryptographic error
    #[must_use]
    pub fn crypto(message: impl Into<String>) -> Self {
        Error::Crypto {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }
}
