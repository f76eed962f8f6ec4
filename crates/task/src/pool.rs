//! Fixed-size worker pool

use crate::config::PoolConfig;
use crate::job::{BoxedWork, Job, JobContext};
use crate::stats::{PoolCounters, PoolStatistics};
use futures::future::BoxFuture;
use keeper_core::{Error, Result};
use keeper_utils::deadline_after;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type SharedReceiver = Arc<AsyncMutex<mpsc::Receiver<Job>>>;

/// Bounded pool of workers executing submitted jobs.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<PoolCounters>,
    /// Parent of every job's cancellation token
    shutdown: CancellationToken,
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for handle in self.workers.lock().drain(..) {
            handle.abort();
        }
    }
}

impl WorkerPool {
    /// Start `config.size` workers on the current tokio runtime
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::configuration("worker pool requires a tokio runtime"))?;

        let (sender, receiver) = mpsc::channel(config.queue_depth);
        let receiver: SharedReceiver = Arc::new(AsyncMutex::new(receiver));
        let counters = Arc::new(PoolCounters::default());

        let workers = (0..config.size)
            .map(|index| runtime.spawn(worker_loop(index, Arc::clone(&receiver), Arc::clone(&counters))))
            .collect();

        tracing::info!(
            workers = config.size,
            queue_depth = config.queue_depth,
            job_timeout_ms = %config.job_timeout.as_millis(),
            "worker pool started"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                sender: RwLock::new(Some(sender)),
                workers: Mutex::new(workers),
                counters,
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Configuration this pool was built with
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Run `work` on the pool with the configured default deadline.
    ///
    /// Waits until the job completes, fails or times out. Fails immediately
    /// with [`Error::QueueFull`] when the queue is saturated.
    pub async fn submit<F, Fut, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit_with_deadline(self.inner.config.job_timeout, work)
            .await
    }

    /// Run `work` on the pool with an explicit deadline.
    ///
    /// The deadline starts at submission and covers time spent queued as
    /// well as execution. On expiry the job's cancellation token fires and
    /// this call returns [`Error::JobTimeout`] without waiting for the work
    /// to stop. A job that expires while queued never starts.
    pub async fn submit_with_deadline<F, Fut, T>(&self, deadline: Duration, work: F) -> Result<T>
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (value_tx, value_rx) = oneshot::channel::<T>();
        let boxed: BoxedWork = Box::new(move |context: JobContext| -> BoxFuture<'static, Result<()>> {
            Box::pin(async move {
                let value = work(context).await?;
                // The caller may have stopped waiting
                let _ = value_tx.send(value);
                Ok(())
            })
        });

        let job_id = Uuid::new_v4().to_string();
        let expires_at = deadline_after(deadline);
        let cancel = self.inner.shutdown.child_token();
        let (job, reply) = Job::new(job_id.clone(), deadline, cancel.clone(), boxed);
        self.enqueue(job)?;

        match tokio::time::timeout_at(expires_at, reply).await {
            Ok(Ok(Ok(()))) => value_rx
                .await
                .map_err(|_| Error::job_failed(&job_id, "job finished without a value")),
            Ok(Ok(Err(error))) => Err(error),
            // Reply sender dropped without a result: the pool went away
            Ok(Err(_)) => Err(Error::PoolClosed),
            Err(_) => {
                cancel.cancel();
                tracing::debug!(job_id = %job_id, "deadline passed before a result arrived");
                Err(Error::job_timeout(&job_id, deadline))
            }
        }
    }

    fn enqueue(&self, job: Job) -> Result<()> {
        let sender = self.inner.sender.read().clone().ok_or(Error::PoolClosed)?;

        match sender.try_send(job) {
            Ok(()) => {
                PoolCounters::incr(&self.inner.counters.submitted);
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                PoolCounters::incr(&self.inner.counters.rejected);
                let capacity = self.inner.config.queue_depth;
                tracing::warn!(job_id = %job.id(), capacity, "job queue full, rejecting");
                Err(Error::queue_full(capacity))
            }
            Err(TrySendError::Closed(_)) => Err(Error::PoolClosed),
        }
    }

    /// Current counters and queue occupancy
    #[must_use]
    pub fn stats(&self) -> PoolStatistics {
        let queued = self
            .inner
            .sender
            .read()
            .as_ref()
            .map_or(0, |s| s.max_capacity() - s.capacity());
        PoolStatistics::collect(
            &self.inner.counters,
            self.inner.config.size,
            self.inner.config.queue_depth,
            queued,
        )
    }

    /// Whether the pool still accepts jobs
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.inner.sender.read().is_some()
    }

    /// Stop accepting jobs, let queued and running jobs finish, then wait
    /// for every worker to exit.
    pub async fn shutdown(&self) {
        drop(self.inner.sender.write().take());
        let workers: Vec<_> = self.inner.workers.lock().drain(..).collect();
        if workers.is_empty() {
            return;
        }
        tracing::info!(workers = workers.len(), "draining worker pool");
        for handle in workers {
            if let Err(error) = handle.await {
                if error.is_panic() {
                    tracing::error!("worker panicked during shutdown");
                }
            }
        }
    }

    /// Stop immediately: cancel running jobs and abort workers.
    ///
    /// Queued jobs never run; their callers receive [`Error::PoolClosed`].
    pub fn shutdown_now(&self) {
        drop(self.inner.sender.write().take());
        self.inner.shutdown.cancel();
        for handle in self.inner.workers.lock().drain(..) {
            handle.abort();
        }
        tracing::info!("worker pool stopped");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.inner.config)
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

async fn worker_loop(index: usize, receiver: SharedReceiver, counters: Arc<PoolCounters>) {
    loop {
        // Only one idle worker waits on the channel at a time
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            tracing::debug!(worker = index, "job queue closed, worker exiting");
            break;
        };
        run_job(index, job, &counters).await;
    }
}

async fn run_job(worker: usize, job: Job, counters: &PoolCounters) {
    let Job {
        context,
        work,
        reply,
    } = job;
    let job_id = context.id().to_string();
    let deadline = context.deadline();
    let cancel = context.cancellation().clone();

    if cancel.is_cancelled() {
        PoolCounters::incr(&counters.timed_out);
        tracing::debug!(worker, job_id = %job_id, "job expired while queued, skipping");
        return;
    }
    if reply.is_closed() {
        tracing::debug!(worker, job_id = %job_id, "caller gone before start, skipping job");
        return;
    }

    let running = RunningGuard::enter(&counters.running);
    tracing::debug!(worker, job_id = %job_id, "job started");

    // A separate task isolates panics from the worker
    let mut handle = tokio::spawn(work(context));

    let outcome = tokio::select! {
        biased;
        joined = tokio::time::timeout(deadline, &mut handle) => match joined {
            Ok(Ok(Ok(()))) => {
                PoolCounters::incr(&counters.completed);
                Ok(())
            }
            Ok(Ok(Err(error))) => {
                PoolCounters::incr(&counters.failed);
                tracing::debug!(worker, job_id = %job_id, error = %error, "job returned an error");
                Err(error)
            }
            Ok(Err(join_error)) => {
                PoolCounters::incr(&counters.failed);
                let message = describe_join_error(join_error);
                tracing::error!(worker, job_id = %job_id, %message, "job crashed");
                Err(Error::job_failed(&job_id, message))
            }
            Err(_) => {
                PoolCounters::incr(&counters.timed_out);
                cancel.cancel();
                tracing::warn!(
                    worker,
                    job_id = %job_id,
                    deadline_ms = %deadline.as_millis(),
                    "job timed out, abandoning"
                );
                Err(Error::job_timeout(&job_id, deadline))
            }
        },
        // The caller's deadline covers queue time, so it can fire first
        () = cancel.cancelled() => {
            PoolCounters::incr(&counters.timed_out);
            tracing::warn!(worker, job_id = %job_id, "job cancelled while running, abandoning");
            Err(Error::job_timeout(&job_id, deadline))
        }
    };

    drop(running);
    // Dropping the handle detaches an abandoned task instead of killing it
    drop(handle);

    if reply.send(outcome).is_err() {
        tracing::debug!(worker, job_id = %job_id, "caller stopped waiting for result");
    }
}

/// Counts a job as running until dropped, including when the worker is
/// aborted mid-job
struct RunningGuard<'a>(&'a AtomicUsize);

impl<'a> RunningGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

fn describe_join_error(error: JoinError) -> String {
    if !error.is_panic() {
        return "job task was cancelled".to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("job panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("job panicked: {message}")
    } else {
        "job panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_job_value() {
        let pool = WorkerPool::new(PoolConfig::with_size(2)).unwrap();
        let value = pool.submit(|_| async { Ok::<_, Error>(21 * 2) }).await.unwrap();
        assert_eq!(value, 42);

        let stats = pool.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.running, 0);
    }

    #[tokio::test]
    async fn test_job_error_is_returned() {
        let pool = WorkerPool::new(PoolConfig::with_size(1)).unwrap();
        let result: Result<()> = pool
            .submit(|_| async { Err(Error::remote_unavailable("stt", "503")) })
            .await;
        assert!(matches!(result, Err(Error::RemoteUnavailable { .. })));
        assert_eq!(pool.stats().failed, 1);
    }

    #[test]
    fn test_requires_runtime() {
        let result = WorkerPool::new(PoolConfig::with_size(1));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_join_error_description() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let error = runtime
            .block_on(async {
                let handle: JoinHandle<()> = tokio::spawn(async { panic!("boom") });
                handle.await
            })
            .unwrap_err();
        assert_eq!(describe_join_error(error), "job panicked: boom");
    }

    #[test]
    fn test_running_guard_releases_on_drop() {
        let counter = AtomicUsize::new(0);
        {
            let _first = RunningGuard::enter(&counter);
            let _second = RunningGuard::enter(&counter);
            assert_eq!(counter.load(Ordering::Relaxed), 2);
        }
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
