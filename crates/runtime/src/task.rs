//! Task metadata, states and handles

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::runtime::RuntimeInner;

/// Runtime-assigned task id, unique per runtime
pub type TaskId = u64;

/// Metadata passed to listener callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Task id
    pub id: TaskId,
    /// When `submit` was called
    pub submitted_at: DateTime<Utc>,
}

/// Lifecycle state of a submitted task.
///
/// ```text
/// Queued -> Running -> Completed | Failed
/// Queued -> Rejected
/// Queued -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting for a worker
    Queued,
    /// A worker (or the submitting thread) is running it
    Running,
    /// Ran to completion
    Completed,
    /// The task body panicked
    Failed,
    /// Refused by the runtime and not run
    Rejected,
    /// Removed from the queue before it ran
    Cancelled,
}

impl TaskState {
    /// True for states a task never leaves
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Queued | TaskState::Running)
    }
}

/// Why a task did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionCause {
    /// Queue full and no idle worker
    QueueFull,
    /// Runtime is shutting down
    Shutdown,
    /// Cancelled through its handle while queued
    Cancelled,
    /// Dropped from the queue by an abandoning shutdown
    Abandoned,
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionCause::QueueFull => "queue full and no idle worker",
            RejectionCause::Shutdown => "runtime is shutting down",
            RejectionCause::Cancelled => "cancelled before it ran",
            RejectionCause::Abandoned => "abandoned at shutdown",
        };
        f.write_str(s)
    }
}

pub(crate) struct TaskShared {
    id: TaskId,
    state: Mutex<TaskState>,
    changed: Condvar,
}

impl TaskShared {
    pub(crate) fn new(id: TaskId) -> Arc<Self> {
        Arc::new(TaskShared {
            id,
            state: Mutex::new(TaskState::Queued),
            changed: Condvar::new(),
        })
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.lock()
    }

    pub(crate) fn set(&self, next: TaskState) {
        *self.state.lock() = next;
        self.changed.notify_all();
    }
}

/// Caller's view of a submitted task.
#[derive(Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
    runtime: Weak<RuntimeInner>,
}

impl TaskHandle {
    pub(crate) fn new(shared: Arc<TaskShared>, runtime: Weak<RuntimeInner>) -> Self {
        TaskHandle { shared, runtime }
    }

    /// Task id
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Block until the task reaches a terminal state
    pub fn wait(&self) -> TaskState {
        let mut state = self.shared.state.lock();
        while !state.is_terminal() {
            self.shared.changed.wait(&mut state);
        }
        *state
    }

    /// Block up to `timeout`; `None` if the task is still queued or running
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskState> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.is_terminal() {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return state.is_terminal().then_some(*state);
            }
        }
        Some(*state)
    }

    /// Cancel the task if it has not started.
    ///
    /// Returns `false` if it is already running or finished.
    pub fn cancel(&self) -> bool {
        match self.runtime.upgrade() {
            Some(inner) => inner.cancel(self.id()),
            None => false,
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
