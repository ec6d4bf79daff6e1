//! Alias chains that loop back on themselves

use crate::common::*;
use rivet::{AliasCycle, NamingScope, ResolutionStrategy};
use std::error::Error as _;
use std::sync::Arc;
use std::thread;

#[test]
fn self_alias_fails_with_resolution_error() {
    init_tracing();
    let scope = NamingScope::new();
    scope.bind("A", ResolutionStrategy::link("A")).unwrap();

    let err = scope.lookup("A").unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
    let cycle = err
        .source()
        .and_then(|s| s.downcast_ref::<AliasCycle>())
        .expect("alias cycle cause");
    assert_eq!(cycle.path, vec!["A", "A"]);
}

#[test]
fn three_step_cycle_reports_full_path() {
    init_tracing();
    let scope = NamingScope::new();
    scope.bind("a", ResolutionStrategy::link("b")).unwrap();
    scope.bind("b", ResolutionStrategy::link("c")).unwrap();
    scope.bind("c", ResolutionStrategy::link("java:a")).unwrap();

    let err = scope.lookup("java:a").unwrap_err();
    let cycle = err
        .source()
        .and_then(|s| s.downcast_ref::<AliasCycle>())
        .expect("alias cycle cause");
    assert_eq!(cycle.path, vec!["a", "b", "c", "a"]);
    assert!(err.to_string().contains("a -> b -> c -> a"));
}

#[test]
fn cross_thread_cycle_terminates() {
    init_tracing();
    let scope = Arc::new(NamingScope::new());
    scope.bind("x", ResolutionStrategy::link("y")).unwrap();
    scope.bind("y", ResolutionStrategy::link("x")).unwrap();

    let handles: Vec<_> = ["x", "y", "x", "y"]
        .into_iter()
        .map(|name| {
            let scope = Arc::clone(&scope);
            thread::spawn(move || scope.lookup(name).map(|_| ()))
        })
        .collect();

    for h in handles {
        assert!(matches!(h.join().unwrap(), Err(Error::Resolution { .. })));
    }
}

#[test]
fn breaking_the_cycle_lets_lookups_succeed() {
    init_tracing();
    let scope = NamingScope::new();
    scope.bind("a", ResolutionStrategy::link("b")).unwrap();
    scope.bind("b", ResolutionStrategy::link("a")).unwrap();
    assert!(scope.lookup("a").is_err());

    scope.unbind("b").unwrap();
    scope.bind_value("b", Arc::new(5i64)).unwrap();
    assert_eq!(*scope.lookup_as::<i64>("a").unwrap(), 5);
}
