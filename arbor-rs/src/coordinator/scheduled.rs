use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::{CommandError, CoordinatorError};
use crate::invocation::Invocation;
use crate::{HandlerError, Output, SystemError};

use super::{ExecutionCoordinator, ExecutionHandle, JobStatus};

struct Job<S> {
    invocation: Invocation<S>,
    status: Arc<JobStatus>,
    reply: oneshot::Sender<Result<Output, CommandError>>,
}

type Queue<S> = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job<S>>>>;

/// Queues invocations for a pool of tokio worker tasks.
///
/// Workers share one FIFO queue. Dequeueing a job and starting its handler
/// happen while the queue lock is held, so handlers start in submission
/// order; completion order is unspecified with more than one worker.
/// Handlers run on tokio's blocking pool.
///
/// Dropping the coordinator (or calling [`shutdown`](Self::shutdown)) closes
/// the queue: queued jobs still run, later submissions fail with
/// [`CommandError::CoordinatorClosed`].
pub struct ScheduledCoordinator<S> {
    queue: Mutex<Option<mpsc::UnboundedSender<Job<S>>>>,
    workers: usize,
}

impl<S: Send + 'static> ScheduledCoordinator<S> {
    /// Spawn `workers` workers on the current tokio runtime.
    pub fn new(workers: usize) -> Result<Self, CoordinatorError> {
        let runtime = Handle::try_current().map_err(|_| CoordinatorError::NoRuntime)?;
        Self::with_runtime(runtime, workers)
    }

    /// Spawn `workers` workers on `runtime`.
    pub fn with_runtime(runtime: Handle, workers: usize) -> Result<Self, CoordinatorError> {
        if workers == 0 {
            return Err(CoordinatorError::ZeroWorkers);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: Queue<S> = Arc::new(tokio::sync::Mutex::new(receiver));
        for worker in 0..workers {
            runtime.spawn(run_worker(worker, Arc::clone(&queue)));
        }
        tracing::info!(workers, "Scheduled coordinator started");

        Ok(Self {
            queue: Mutex::new(Some(sender)),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Stop accepting work. Already queued jobs still run.
    pub fn shutdown(&self) {
        if self.queue.lock().take().is_some() {
            tracing::info!("Scheduled coordinator closed");
        }
    }
}

impl<S: Send + 'static> ExecutionCoordinator<S> for ScheduledCoordinator<S> {
    fn coordinate(&self, invocation: Invocation<S>) -> ExecutionHandle {
        let status = Arc::new(JobStatus::default());
        let (reply, receiver) = oneshot::channel();
        let job = Job {
            invocation,
            status: Arc::clone(&status),
            reply,
        };

        let submitted = match self.queue.lock().as_ref() {
            Some(queue) => queue.send(job).is_ok(),
            None => false,
        };
        if !submitted {
            tracing::warn!("Submission to a closed coordinator");
            return ExecutionHandle::ready(Err(CommandError::CoordinatorClosed));
        }
        ExecutionHandle::pending(receiver, status)
    }
}

async fn run_worker<S: Send + 'static>(worker: usize, queue: Queue<S>) {
    loop {
        let started = {
            let mut receiver = queue.lock().await;
            let mut started = None;
            while let Some(job) = receiver.recv().await {
                if !job.status.try_start() {
                    tracing::debug!(worker, "Skipping cancelled invocation");
                    continue;
                }
                let Job {
                    invocation, reply, ..
                } = job;
                let (entered, on_entered) = oneshot::channel::<()>();
                let task = tokio::task::spawn_blocking(move || {
                    let _ = entered.send(());
                    invocation.run()
                });
                let _ = on_entered.await;
                started = Some((task, reply));
                break;
            }
            started
        };

        let Some((task, reply)) = started else {
            tracing::debug!(worker, "Worker exiting, queue closed");
            return;
        };

        let result = match task.await {
            Ok(result) => result.map_err(CommandError::Handler),
            Err(err) => Err(CommandError::Handler(HandlerError::System(
                SystemError::Panicked(err.to_string()),
            ))),
        };
        if let Err(err) = &result {
            tracing::warn!(worker, error = %err, "Command failed");
        }
        if reply.send(result).is_err() {
            tracing::debug!(worker, "Execution handle dropped before completion");
        }
    }
}
