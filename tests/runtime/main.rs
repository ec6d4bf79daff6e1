//! Runtime Integration Tests
//!
//! Saturation, rejection ordering, listener isolation and shutdown.

#[path = "../common/mod.rs"]
mod common;

mod lifecycle;

use parking_lot::Mutex;
use rivet::{RejectionCause, TaskInfo, TaskListener, TaskState};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Listener event, recorded in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Submitted(u64),
    Starting(u64),
    Done(u64, TaskState),
    Aborted(u64, RejectionCause),
}

/// Listener that records every callback into a shared log.
pub struct Recorder {
    pub log: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new(log: &Arc<Mutex<Vec<Event>>>) -> Arc<Self> {
        Arc::new(Recorder {
            log: Arc::clone(log),
        })
    }
}

impl TaskListener for Recorder {
    fn on_submitted(&self, task: &TaskInfo) {
        self.log.lock().push(Event::Submitted(task.id));
    }

    fn on_starting(&self, task: &TaskInfo) {
        self.log.lock().push(Event::Starting(task.id));
    }

    fn on_done(&self, task: &TaskInfo, state: TaskState) {
        self.log.lock().push(Event::Done(task.id, state));
    }

    fn on_aborted(&self, task: &TaskInfo, cause: &RejectionCause) {
        self.log.lock().push(Event::Aborted(task.id, *cause));
    }
}

/// A task body that reports when it starts and blocks until released.
pub struct Gate {
    started: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl Gate {
    pub fn task() -> (Gate, impl FnOnce() + Send + 'static) {
        let (started_tx, started) = mpsc::channel();
        let (release, release_rx) = mpsc::channel::<()>();
        let body = move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv_timeout(Duration::from_secs(10));
        };
        (Gate { started, release }, body)
    }

    pub fn wait_started(&self) {
        self.started
            .recv_timeout(Duration::from_secs(5))
            .expect("task never started");
    }

    pub fn open(&self) {
        let _ = self.release.send(());
    }
}
