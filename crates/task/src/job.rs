//! Units of work queued on the pool

use futures::future::BoxFuture;
use keeper_core::Result;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Handed to a job's work when it starts running
#[derive(Debug, Clone)]
pub struct JobContext {
    id: String,
    deadline: Duration,
    cancel: CancellationToken,
}

impl JobContext {
    /// Identifier used in logs and errors
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Budget for this job, measured from submission
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Fires when the job times out or the pool shuts down.
    ///
    /// Long-running work should select on this so abandoned jobs stop
    /// consuming resources.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the job has been abandoned
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub(crate) type BoxedWork = Box<dyn FnOnce(JobContext) -> BoxFuture<'static, Result<()>> + Send>;

/// A queued job. Owned by the pool until its single reply is sent.
pub(crate) struct Job {
    pub context: JobContext,
    pub work: BoxedWork,
    pub reply: oneshot::Sender<Result<()>>,
}

impl Job {
    pub fn new(
        id: String,
        deadline: Duration,
        cancel: CancellationToken,
        work: BoxedWork,
    ) -> (Self, oneshot::Receiver<Result<()>>) {
        let (reply, receiver) = oneshot::channel();
        let job = Self {
            context: JobContext {
                id,
                deadline,
                cancel,
            },
            work,
            reply,
        };
        (job, receiver)
    }

    pub fn id(&self) -> &str {
        &self.context.id
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.context.id)
            .field("deadline", &self.context.deadline)
            .finish_non_exhaustive()
    }
}
