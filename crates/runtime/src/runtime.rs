//! Bounded managed task runtime
//!
//! A fixed pool of worker threads takes tasks from a bounded FIFO queue. A
//! task is refused only when the queue is full and no idle worker can take
//! it, or when the runtime is shutting down. A refused task's listener is
//! told first (`on_aborted`), then the configured [`RejectionPolicy`] decides
//! what the submitter sees.
//!
//! All queue mutation and the refuse/accept decision happen under one mutex.
//! Listener callbacks and rejection policies run outside it.

use crate::listener::{notify, notify_aborted, TaskListener};
use crate::policy::{run_task, AbortPolicy, RejectedTask, RejectionPolicy, Work};
use crate::task::{RejectionCause, TaskHandle, TaskId, TaskInfo, TaskShared, TaskState};
use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use rivet_core::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// What `shutdown` does with tasks still in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Run every queued task before the workers exit
    #[default]
    Drain,
    /// Cancel queued tasks (listeners see `Abandoned`); only running tasks finish
    Abandon,
}

/// Pool sizing and shutdown behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of worker threads, at least 1
    pub worker_threads: usize,
    /// Pending tasks allowed beyond those idle workers can take
    pub queue_capacity: usize,
    /// Queue handling at shutdown
    pub shutdown: ShutdownPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            worker_threads: 4,
            queue_capacity: 1024,
            shutdown: ShutdownPolicy::Drain,
        }
    }
}

/// Runtime metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Tasks waiting in the queue
    pub queue_depth: usize,
    /// Tasks currently run by workers
    pub active_tasks: usize,
    /// Workers waiting for work
    pub idle_workers: usize,
    /// Worker threads
    pub worker_count: usize,
    /// Tasks accepted into the queue
    pub tasks_accepted: u64,
    /// Tasks run to completion by workers
    pub tasks_completed: u64,
    /// Tasks whose body panicked on a worker
    pub tasks_failed: u64,
    /// Tasks refused at submission
    pub tasks_rejected: u64,
    /// Tasks cancelled or abandoned while queued
    pub tasks_cancelled: u64,
}

struct QueuedTask {
    info: TaskInfo,
    work: Work,
    listener: Option<Arc<dyn TaskListener>>,
    shared: Arc<TaskShared>,
}

struct RuntimeState {
    queue: VecDeque<QueuedTask>,
    idle: usize,
    active: usize,
    shutdown: bool,
    stats: RuntimeStats,
}

pub(crate) struct RuntimeInner {
    state: Mutex<RuntimeState>,
    work_ready: Condvar,
    state_changed: Condvar,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl RuntimeInner {
    /// Remove a queued task. Runs `on_aborted` with `Cancelled` outside the lock.
    pub(crate) fn cancel(&self, id: TaskId) -> bool {
        let task = {
            let mut state = self.state.lock();
            let Some(pos) = state.queue.iter().position(|t| t.info.id == id) else {
                return false;
            };
            let task = state.queue.remove(pos);
            if task.is_some() {
                state.stats.tasks_cancelled += 1;
            }
            task
        };

        match task {
            Some(task) => {
                debug!(task = id, "task cancelled");
                task.shared.set(TaskState::Cancelled);
                notify_aborted(task.listener.as_deref(), &task.info, &RejectionCause::Cancelled);
                self.state_changed.notify_all();
                true
            }
            None => false,
        }
    }
}

/// Bounded pool of worker threads with per-task listeners.
pub struct ManagedTaskRuntime {
    inner: Arc<RuntimeInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    policy: Arc<dyn RejectionPolicy>,
    config: RuntimeConfig,
}

impl ManagedTaskRuntime {
    /// Start a runtime with [`AbortPolicy`].
    ///
    /// # Errors
    ///
    /// `Config` if `worker_threads` is 0 or a worker thread cannot be spawned.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::with_policy(config, Arc::new(AbortPolicy))
    }

    /// Start a runtime with a custom rejection policy.
    ///
    /// Returns once every worker is waiting for work.
    pub fn with_policy(config: RuntimeConfig, policy: Arc<dyn RejectionPolicy>) -> Result<Self> {
        if config.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".to_string()));
        }

        let inner = Arc::new(RuntimeInner {
            state: Mutex::new(RuntimeState {
                queue: VecDeque::new(),
                idle: 0,
                active: 0,
                shutdown: false,
                stats: RuntimeStats {
                    worker_count: config.worker_threads,
                    ..RuntimeStats::default()
                },
            }),
            work_ready: Condvar::new(),
            state_changed: Condvar::new(),
            next_id: AtomicU64::new(1),
            queue_capacity: config.queue_capacity,
        });

        let runtime = ManagedTaskRuntime {
            inner,
            workers: Mutex::new(Vec::with_capacity(config.worker_threads)),
            policy,
            config,
        };

        for i in 0..runtime.config.worker_threads {
            let inner = Arc::clone(&runtime.inner);
            let spawned = std::thread::Builder::new()
                .name(format!("rivet-worker-{}", i))
                .spawn(move || worker_loop(&inner));
            match spawned {
                Ok(handle) => runtime.workers.lock().push(handle),
                Err(e) => {
                    // Dropping `runtime` shuts down the workers already started
                    return Err(Error::Config(format!("failed to spawn worker thread: {}", e)));
                }
            }
        }

        {
            let mut state = runtime.inner.state.lock();
            while state.idle < runtime.config.worker_threads {
                runtime.inner.state_changed.wait(&mut state);
            }
        }

        info!(
            workers = runtime.config.worker_threads,
            queue_capacity = runtime.config.queue_capacity,
            "managed task runtime started"
        );
        Ok(runtime)
    }

    /// Runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Submit a task.
    ///
    /// The listener, if any, sees `on_submitted` first. If the task is refused,
    /// `on_aborted` runs on this thread before the rejection policy.
    ///
    /// # Errors
    ///
    /// Whatever the rejection policy returns for a refused task
    /// (`TaskRejected` under [`AbortPolicy`]).
    pub fn submit<F>(&self, work: F, listener: Option<Arc<dyn TaskListener>>) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let info = TaskInfo {
            id,
            submitted_at: Utc::now(),
        };
        let shared = TaskShared::new(id);
        let handle = TaskHandle::new(Arc::clone(&shared), Arc::downgrade(&self.inner));

        notify(listener.as_deref(), &info, "on_submitted", |l| l.on_submitted(&info));

        let task = QueuedTask {
            info,
            work: Box::new(work),
            listener,
            shared,
        };

        let (task, cause) = {
            let mut state = self.inner.state.lock();
            let cause = if state.shutdown {
                Some(RejectionCause::Shutdown)
            } else if state.queue.len() >= self.inner.queue_capacity.saturating_add(state.idle) {
                Some(RejectionCause::QueueFull)
            } else {
                None
            };

            match cause {
                None => {
                    state.queue.push_back(task);
                    state.stats.tasks_accepted += 1;
                    self.inner.work_ready.notify_one();
                    return Ok(handle);
                }
                Some(cause) => {
                    state.stats.tasks_rejected += 1;
                    (task, cause)
                }
            }
        };

        warn!(task = id, cause = %cause, "task rejected");
        notify_aborted(task.listener.as_deref(), &task.info, &cause);
        let rejected = RejectedTask::new(task.info, cause, task.work, task.listener, task.shared);
        self.policy.reject(rejected)?;
        Ok(handle)
    }

    /// Block until the queue is empty and no task is running.
    ///
    /// Workers stay up; this does not shut the runtime down.
    pub fn drain(&self) {
        let mut state = self.inner.state.lock();
        while !state.queue.is_empty() || state.active > 0 {
            self.inner.state_changed.wait(&mut state);
        }
    }

    /// Shut down with the configured [`ShutdownPolicy`]
    pub fn shutdown(&self) {
        self.shutdown_with(self.config.shutdown);
    }

    /// Refuse new work, handle queued tasks per `policy`, and join the workers.
    ///
    /// Idempotent.
    pub fn shutdown_with(&self, policy: ShutdownPolicy) {
        let abandoned: Vec<QueuedTask> = {
            let mut state = self.inner.state.lock();
            if !state.shutdown {
                info!(?policy, queued = state.queue.len(), "shutting down task runtime");
            }
            state.shutdown = true;
            let abandoned: Vec<QueuedTask> = match policy {
                ShutdownPolicy::Drain => Vec::new(),
                ShutdownPolicy::Abandon => state.queue.drain(..).collect(),
            };
            state.stats.tasks_cancelled += abandoned.len() as u64;
            self.inner.work_ready.notify_all();
            abandoned
        };

        for task in abandoned {
            task.shared.set(TaskState::Cancelled);
            notify_aborted(task.listener.as_deref(), &task.info, &RejectionCause::Abandoned);
        }

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
        self.inner.state_changed.notify_all();
    }

    /// True once shutdown has started
    pub fn is_shutdown(&self) -> bool {
        self.inner.state.lock().shutdown
    }

    /// Snapshot of runtime metrics
    pub fn stats(&self) -> RuntimeStats {
        let state = self.inner.state.lock();
        RuntimeStats {
            queue_depth: state.queue.len(),
            active_tasks: state.active,
            idle_workers: state.idle,
            ..state.stats.clone()
        }
    }
}

impl Drop for ManagedTaskRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements the active count and wakes drain waiters, even if bookkeeping
/// after the task panics.
struct ActiveTaskGuard<'a> {
    inner: &'a RuntimeInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.active -= 1;
        if state.active == 0 && state.queue.is_empty() {
            self.inner.state_changed.notify_all();
        }
    }
}

fn worker_loop(inner: &RuntimeInner) {
    loop {
        let task = {
            let mut state = inner.state.lock();
            loop {
                if let Some(task) = state.queue.pop_front() {
                    state.active += 1;
                    break task;
                }
                if state.shutdown {
                    return;
                }
                state.idle += 1;
                inner.state_changed.notify_all();
                inner.work_ready.wait(&mut state);
                state.idle -= 1;
            }
        };

        let _guard = ActiveTaskGuard { inner };
        run_task(
            &task.info,
            task.work,
            task.listener.as_deref(),
            &task.shared,
            |outcome| {
                let mut state = inner.state.lock();
                match outcome {
                    TaskState::Completed => state.stats.tasks_completed += 1,
                    _ => state.stats.tasks_failed += 1,
                }
            },
        );
    }
}
