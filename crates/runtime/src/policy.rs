//! Rejection policies
//!
//! When the runtime refuses a task it first notifies the task's listener and
//! then hands the task to a [`RejectionPolicy`]. A [`RejectedTask`] that the
//! policy neither runs nor keeps ends in `Rejected` when dropped.

use crate::listener::{notify, panic_message, TaskListener};
use crate::task::{RejectionCause, TaskInfo, TaskShared, TaskState};
use rivet_core::{Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

pub(crate) type Work = Box<dyn FnOnce() + Send + 'static>;

/// A task the runtime refused, handed to the rejection policy.
pub struct RejectedTask {
    info: TaskInfo,
    cause: RejectionCause,
    work: Option<Work>,
    listener: Option<Arc<dyn TaskListener>>,
    shared: Arc<TaskShared>,
}

impl RejectedTask {
    pub(crate) fn new(
        info: TaskInfo,
        cause: RejectionCause,
        work: Work,
        listener: Option<Arc<dyn TaskListener>>,
        shared: Arc<TaskShared>,
    ) -> Self {
        RejectedTask {
            info,
            cause,
            work: Some(work),
            listener,
            shared,
        }
    }

    /// Task metadata
    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    /// Why the runtime refused it
    pub fn cause(&self) -> RejectionCause {
        self.cause
    }

    /// Run the task on the current thread
    pub fn run(mut self) -> TaskState {
        match self.work.take() {
            Some(work) => {
                run_task(&self.info, work, self.listener.as_deref(), &self.shared, |_| {})
            }
            None => self.shared.state(),
        }
    }

    /// Drop the task without running it
    pub fn discard(self) {}
}

impl Drop for RejectedTask {
    fn drop(&mut self) {
        if self.work.is_some() {
            self.shared.set(TaskState::Rejected);
        }
    }
}

/// What happens to a refused task after its listener has been told.
pub trait RejectionPolicy: Send + Sync {
    /// Dispose of `task`. An error is returned to the submitter.
    fn reject(&self, task: RejectedTask) -> Result<()>;
}

/// Refuse with `TaskRejected`. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortPolicy;

impl RejectionPolicy for AbortPolicy {
    fn reject(&self, task: RejectedTask) -> Result<()> {
        Err(Error::TaskRejected {
            task: task.info().id,
            reason: task.cause().to_string(),
        })
    }
}

/// Drop the task silently; `submit` still succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardPolicy;

impl RejectionPolicy for DiscardPolicy {
    fn reject(&self, task: RejectedTask) -> Result<()> {
        debug!(task = task.info().id, cause = %task.cause(), "discarding rejected task");
        task.discard();
        Ok(())
    }
}

/// Run the task on the submitting thread, unless the runtime is shutting down.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallerRunsPolicy;

impl RejectionPolicy for CallerRunsPolicy {
    fn reject(&self, task: RejectedTask) -> Result<()> {
        if task.cause() == RejectionCause::Shutdown {
            return AbortPolicy.reject(task);
        }
        debug!(task = task.info().id, "running rejected task on caller thread");
        task.run();
        Ok(())
    }
}

/// Run a task body with listener hooks and panic containment, recording the outcome.
///
/// `record` sees the outcome before it is published to the task handle, so
/// bookkeeping done there is visible to anyone woken by `wait`.
pub(crate) fn run_task(
    info: &TaskInfo,
    work: Work,
    listener: Option<&dyn TaskListener>,
    shared: &TaskShared,
    record: impl FnOnce(TaskState),
) -> TaskState {
    shared.set(TaskState::Running);
    notify(listener, info, "on_starting", |l| l.on_starting(info));

    let outcome = match catch_unwind(AssertUnwindSafe(work)) {
        Ok(()) => TaskState::Completed,
        Err(panic) => {
            error!(task = info.id, "task panicked: {}", panic_message(&*panic));
            TaskState::Failed
        }
    };

    record(outcome);
    shared.set(outcome);
    notify(listener, info, "on_done", |l| l.on_done(info, outcome));
    outcome
}
