//! Task listeners
//!
//! A listener is attached per task at submission. Every callback runs on
//! whichever thread drives that step; panics inside a callback are caught and
//! logged so a broken listener never takes down a worker or skips the
//! rejection policy.

use crate::task::{RejectionCause, TaskInfo, TaskState};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Observer of one task's lifecycle.
pub trait TaskListener: Send + Sync {
    /// The task was handed to `submit`
    fn on_submitted(&self, _task: &TaskInfo) {}

    /// A thread is about to run the task
    fn on_starting(&self, _task: &TaskInfo) {}

    /// The task finished running (`Completed` or `Failed`)
    fn on_done(&self, _task: &TaskInfo, _state: TaskState) {}

    /// The task will not run. Called before the rejection policy acts.
    fn on_aborted(&self, task: &TaskInfo, cause: &RejectionCause);
}

pub(crate) fn notify(listener: Option<&dyn TaskListener>, task: &TaskInfo, hook: &str, f: impl FnOnce(&dyn TaskListener)) {
    let Some(listener) = listener else {
        return;
    };
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(listener))) {
        warn!(
            task = task.id,
            hook,
            "task listener panicked: {}",
            panic_message(&*panic)
        );
    }
}

pub(crate) fn notify_aborted(listener: Option<&dyn TaskListener>, task: &TaskInfo, cause: &RejectionCause) {
    notify(listener, task, "on_aborted", |l| l.on_aborted(task, cause));
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}
