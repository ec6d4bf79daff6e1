//! Managed task runtime for rivet
//!
//! A bounded pool of worker threads with per-task listeners. When a task is
//! refused, its listener's `on_aborted` runs before the rejection policy, so
//! whoever submitted the work can release resources tied to it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod listener;
pub mod policy;
pub mod runtime;
pub mod task;

pub use listener::TaskListener;
pub use policy::{AbortPolicy, CallerRunsPolicy, DiscardPolicy, RejectedTask, RejectionPolicy};
pub use runtime::{ManagedTaskRuntime, RuntimeConfig, RuntimeStats, ShutdownPolicy};
pub use task::{RejectionCause, TaskHandle, TaskId, TaskInfo, TaskState};
