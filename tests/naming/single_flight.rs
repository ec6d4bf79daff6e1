//! Concurrent first access to one reference

use crate::common::*;
use rivet::{NamingScope, ProviderError, ResolutionStrategy, Target};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn slow_provider(calls: Arc<AtomicUsize>) -> ResolutionStrategy {
    ResolutionStrategy::provider(move |_: &str| -> std::result::Result<Target, ProviderError> {
        calls.fetch_add(1, Ordering::SeqCst);
        // Keep the slot in Resolving long enough for every thread to pile up
        thread::sleep(Duration::from_millis(50));
        Ok(Arc::new(String::from("connection")))
    })
}

#[test]
fn concurrent_first_lookups_share_one_target() {
    init_tracing();
    const THREADS: usize = 16;

    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Arc::new(NamingScope::new());
    scope
        .bind("java:comp/env/jdbc/Orders", slow_provider(Arc::clone(&calls)))
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let scope = Arc::clone(&scope);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                scope.lookup("java:comp/env/jdbc/Orders").unwrap()
            })
        })
        .collect();

    let targets: Vec<Target> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for t in &targets[1..] {
        assert!(Arc::ptr_eq(&targets[0], t));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let reference = scope.reference("comp/env/jdbc/Orders").unwrap().unwrap();
    assert!(reference.is_resolved());
    assert_eq!(reference.attempts(), 1);
}

#[test]
fn concurrent_waiters_share_one_failure() {
    init_tracing();
    const THREADS: usize = 8;

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let scope = Arc::new(NamingScope::new());
    scope
        .bind(
            "jms/Queue",
            ResolutionStrategy::provider(move |_: &str| -> std::result::Result<Target, ProviderError> {
                c.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Err("broker unavailable".into())
            }),
        )
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let scope = Arc::clone(&scope);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                scope.lookup("jms/Queue").map(|_| ())
            })
        })
        .collect();

    for h in handles {
        match h.join().unwrap() {
            Err(Error::Resolution { name, .. }) => assert_eq!(name, "jms/Queue"),
            other => panic!("Wrong result: {:?}", other),
        }
    }
    // Threads that arrived after the first attempt finished may retry
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert!(calls.load(Ordering::SeqCst) <= THREADS);
}

#[test]
fn concurrent_lookups_through_alias() {
    init_tracing();
    const THREADS: usize = 8;

    let calls = Arc::new(AtomicUsize::new(0));
    let scope = Arc::new(NamingScope::new());
    scope.bind("ejb/CalculatorImpl", slow_provider(Arc::clone(&calls))).unwrap();
    scope
        .bind("java:comp/env/ejb/Calculator", ResolutionStrategy::link("ejb/CalculatorImpl"))
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let scope = Arc::clone(&scope);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let name = if i % 2 == 0 {
                    "java:comp/env/ejb/Calculator"
                } else {
                    "ejb/CalculatorImpl"
                };
                scope.lookup(name).unwrap()
            })
        })
        .collect();

    let targets: Vec<Target> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for t in &targets[1..] {
        assert!(Arc::ptr_eq(&targets[0], t));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
