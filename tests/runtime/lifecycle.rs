//! Task lifecycle from submission to shutdown

use crate::common::*;
use crate::{Event, Gate, Recorder};
use parking_lot::Mutex;
use rivet::{ManagedTaskRuntime, RejectionCause, RuntimeConfig, ShutdownPolicy, TaskState};
use std::sync::Arc;
use std::time::Duration;

fn one_worker() -> RuntimeConfig {
    RuntimeConfig {
        worker_threads: 1,
        queue_capacity: 8,
        ..RuntimeConfig::default()
    }
}

#[test]
fn listener_sees_submit_start_done_in_order() {
    init_tracing();
    let runtime = ManagedTaskRuntime::new(one_worker()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = runtime.submit(|| {}, Some(Recorder::new(&log))).unwrap();
    assert_eq!(handle.wait(), TaskState::Completed);
    runtime.drain();

    let id = handle.id();
    assert_eq!(
        *log.lock(),
        vec![
            Event::Submitted(id),
            Event::Starting(id),
            Event::Done(id, TaskState::Completed),
        ]
    );
}

#[test]
fn panicking_task_is_failed_and_worker_survives() {
    init_tracing();
    let runtime = ManagedTaskRuntime::new(one_worker()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let bad = runtime
        .submit(|| panic!("task exploded"), Some(Recorder::new(&log)))
        .unwrap();
    assert_eq!(bad.wait(), TaskState::Failed);

    let good = runtime.submit(|| {}, None).unwrap();
    assert_eq!(good.wait(), TaskState::Completed);
    runtime.drain();

    assert!(log
        .lock()
        .contains(&Event::Done(bad.id(), TaskState::Failed)));
    let stats = runtime.stats();
    assert_eq!(stats.tasks_failed, 1);
    assert_eq!(stats.tasks_completed, 1);
}

#[test]
fn cancel_queued_task() {
    init_tracing();
    let runtime = ManagedTaskRuntime::new(one_worker()).unwrap();
    let (gate, body) = Gate::task();
    let running = runtime.submit(body, None).unwrap();
    gate.wait_started();

    let log = Arc::new(Mutex::new(Vec::new()));
    let queued = runtime.submit(|| {}, Some(Recorder::new(&log))).unwrap();
    assert_eq!(queued.state(), TaskState::Queued);

    assert!(queued.cancel());
    assert!(!queued.cancel());
    assert!(!running.cancel());
    assert_eq!(queued.state(), TaskState::Cancelled);
    assert!(log
        .lock()
        .contains(&Event::Aborted(queued.id(), RejectionCause::Cancelled)));

    gate.open();
    assert_eq!(running.wait(), TaskState::Completed);
    assert_eq!(
        queued.wait_timeout(Duration::from_millis(10)),
        Some(TaskState::Cancelled)
    );
}

#[test]
fn drain_shutdown_runs_queued_work() {
    init_tracing();
    let runtime = ManagedTaskRuntime::new(one_worker()).unwrap();
    let (gate, body) = Gate::task();
    runtime.submit(body, None).unwrap();
    gate.wait_started();

    let queued: Vec<_> = (0..3).map(|_| runtime.submit(|| {}, None).unwrap()).collect();
    gate.open();
    runtime.shutdown_with(ShutdownPolicy::Drain);

    for handle in queued {
        assert_eq!(handle.state(), TaskState::Completed);
    }
    assert!(runtime.is_shutdown());
}

#[test]
fn abandon_shutdown_notifies_queued_listeners() {
    init_tracing();
    let runtime = ManagedTaskRuntime::new(one_worker()).unwrap();
    let (gate, body) = Gate::task();
    let running = runtime.submit(body, None).unwrap();
    gate.wait_started();

    let log = Arc::new(Mutex::new(Vec::new()));
    let queued = runtime.submit(|| {}, Some(Recorder::new(&log))).unwrap();

    // Release the running task only once shutdown has taken the queue
    let opener = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        gate.open();
    });
    runtime.shutdown_with(ShutdownPolicy::Abandon);
    opener.join().unwrap();

    assert_eq!(running.state(), TaskState::Completed);
    assert_eq!(queued.state(), TaskState::Cancelled);
    assert!(log
        .lock()
        .contains(&Event::Aborted(queued.id(), RejectionCause::Abandoned)));
    assert_eq!(runtime.stats().tasks_cancelled, 1);
}

#[test]
fn submit_after_shutdown_is_rejected() {
    init_tracing();
    let runtime = ManagedTaskRuntime::new(one_worker()).unwrap();
    runtime.shutdown();
    runtime.shutdown();

    let log = Arc::new(Mutex::new(Vec::new()));
    assert!(matches!(
        runtime.submit(|| {}, Some(Recorder::new(&log))),
        Err(Error::TaskRejected { .. })
    ));
    assert!(matches!(
        log.lock().last(),
        Some(Event::Aborted(_, RejectionCause::Shutdown))
    ));
}
