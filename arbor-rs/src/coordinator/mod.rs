//! Execution coordinators decide how resolved invocations run.
//!
//! Both variants report through the same [`ExecutionHandle`], so callers never
//! need to know which one is active.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::CommandError;
use crate::invocation::Invocation;
use crate::Output;

mod immediate;
mod scheduled;

pub use immediate::ImmediateCoordinator;
pub use scheduled::ScheduledCoordinator;

/// Runs invocations and reports their outcome.
pub trait ExecutionCoordinator<S>: Send + Sync {
    fn coordinate(&self, invocation: Invocation<S>) -> ExecutionHandle;
}

// ============================================================================
// Job Status
// ============================================================================

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared between a queued job and its handle.
#[derive(Debug, Default)]
pub(crate) struct JobStatus(AtomicU8);

impl JobStatus {
    /// Pending -> Running. Fails if the job was cancelled.
    pub fn try_start(&self) -> bool {
        self.0
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Pending -> Cancelled. Fails once the job has started.
    pub fn try_cancel(&self) -> bool {
        self.0
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire) == RUNNING
    }
}

// ============================================================================
// Execution Handle
// ============================================================================

type Outcome = Result<Output, CommandError>;

/// Observable state of an [`ExecutionHandle`].
#[derive(Debug)]
pub enum HandleState<'a> {
    Pending,
    Completed(&'a Output),
    Failed(&'a CommandError),
    /// The outcome was already taken out of the handle.
    Taken,
}

/// Eventual outcome of an executed command.
///
/// Await it, or poll it without blocking through [`state`](Self::state) and
/// [`try_take`](Self::try_take).
#[derive(Debug)]
pub struct ExecutionHandle {
    receiver: Option<oneshot::Receiver<Outcome>>,
    result: Option<Outcome>,
    status: Option<Arc<JobStatus>>,
}

impl ExecutionHandle {
    /// Handle that is already finished.
    pub fn ready(result: Outcome) -> Self {
        Self {
            receiver: None,
            result: Some(result),
            status: None,
        }
    }

    pub(crate) fn pending(receiver: oneshot::Receiver<Outcome>, status: Arc<JobStatus>) -> Self {
        Self {
            receiver: Some(receiver),
            result: None,
            status: Some(status),
        }
    }

    fn poll_ready(&mut self) {
        if self.result.is_some() {
            return;
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(result) => self.result = Some(result),
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.result = Some(Err(CommandError::CoordinatorClosed))
            }
        }
        self.receiver = None;
    }

    pub fn state(&mut self) -> HandleState<'_> {
        self.poll_ready();
        match &self.result {
            Some(Ok(output)) => HandleState::Completed(output),
            Some(Err(err)) => HandleState::Failed(err),
            None if self.receiver.is_some() => HandleState::Pending,
            None => HandleState::Taken,
        }
    }

    /// Take the outcome if it is available.
    pub fn try_take(&mut self) -> Option<Outcome> {
        self.poll_ready();
        self.result.take()
    }

    pub fn is_finished(&mut self) -> bool {
        !matches!(self.state(), HandleState::Pending)
    }

    /// Whether a worker has started the handler and it has not reported yet.
    pub fn is_running(&mut self) -> bool {
        matches!(self.state(), HandleState::Pending)
            && self.status.as_ref().is_some_and(|status| status.is_running())
    }

    /// Cancel a queued invocation before its handler starts.
    ///
    /// Returns `false` if the handler already started or the handle is
    /// finished; running handlers are never interrupted.
    pub fn cancel(&mut self) -> bool {
        if self.result.is_some() {
            return false;
        }
        match &self.status {
            Some(status) if status.try_cancel() => {
                self.receiver = None;
                self.result = Some(Err(CommandError::Cancelled));
                true
            }
            _ => false,
        }
    }
}

impl Future for ExecutionHandle {
    type Output = Outcome;

    /// Resolves to `CoordinatorClosed` if the outcome was already taken.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.result.take() {
            return Poll::Ready(result);
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(Err(CommandError::CoordinatorClosed));
        };
        match Pin::new(receiver).poll(cx) {
            Poll::Ready(result) => {
                self.receiver = None;
                Poll::Ready(result.unwrap_or(Err(CommandError::CoordinatorClosed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
