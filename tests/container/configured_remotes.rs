//! Remote references declared in configuration

use crate::common::*;
use rivet::{RemoteConfig, RemoteErrorKind, TaskState};
use std::sync::{Arc, Mutex};

const PEER: &str = "rpc://calc.internal:4201";

fn config_with_calculator() -> ContainerConfig {
    let mut config = ContainerConfig::default();
    config.executor.worker_threads = 2;
    config.remote.push(RemoteConfig {
        name: "java:global/Calculator".to_string(),
        uri: PEER.to_string(),
        object: "Calculator".to_string(),
        interface: "Calculator".to_string(),
    });
    config
}

#[test]
fn configured_remote_resolves_once_interface_is_registered() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, PEER);
    let container = Container::open(config_with_calculator(), transport).unwrap();

    // Bound at open, but the interface is unknown until registered
    assert!(container.naming().reference("global/Calculator").unwrap().is_some());
    assert!(matches!(
        container.lookup_proxy("java:global/Calculator"),
        Err(Error::Resolution { .. })
    ));

    container.register_interface(calculator_interface()).unwrap();
    assert!(matches!(
        container.register_interface(calculator_interface()),
        Err(Error::AlreadyBound(_))
    ));

    let calc = container.lookup_proxy("java:global/Calculator").unwrap();
    assert_eq!(
        calc.invoke("add", Some(vec![Value::Int(19), Value::Int(23)])).unwrap(),
        Value::Int(42)
    );
    container.shutdown();
}

#[test]
fn duplicate_configured_names_are_rejected() {
    init_tracing();
    let mut config = config_with_calculator();
    let dup = config.remote[0].clone();
    config.remote.push(dup);
    assert!(Container::open(config, Arc::new(LoopbackTransport::new())).is_err());
}

#[test]
fn bind_remote_at_runtime() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, "https://calc.example.com");
    let container = Container::open(ContainerConfig::default(), transport).unwrap();

    let reference = container
        .bind_remote(
            "ejb/Calculator",
            "https://CALC.example.com:443/ignored/path",
            "Calculator",
            calculator_interface(),
        )
        .unwrap();
    assert!(!reference.is_resolved());

    let calc = container.lookup_proxy("ejb/Calculator").unwrap();
    assert!(reference.is_resolved());
    let err = calc
        .invoke("div", Some(vec![Value::Int(1), Value::Int(0)]))
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::ApplicationFault));

    assert!(matches!(
        container.bind_remote("ejb/Other", "ftp://calc:21", "Calculator", calculator_interface()),
        Err(Error::InvalidEndpoint { .. })
    ));
}

#[test]
fn remote_calls_as_managed_tasks() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, PEER);
    let container = Container::open(config_with_calculator(), transport).unwrap();
    container.register_interface(calculator_interface()).unwrap();
    let calc = container.lookup_proxy("java:global/Calculator").unwrap();

    let results = Arc::new(Mutex::new(Vec::new()));
    let handles: Vec<_> = (0..10i64)
        .map(|i| {
            let calc = Arc::clone(&calc);
            let results = Arc::clone(&results);
            container
                .runtime()
                .submit(
                    move || {
                        let sum = calc.invoke("add", Some(vec![Value::Int(i), Value::Int(i)]));
                        results.lock().unwrap().push(sum.unwrap());
                    },
                    None,
                )
                .unwrap()
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.wait(), TaskState::Completed);
    }
    let mut sums: Vec<i64> = results
        .lock()
        .unwrap()
        .iter()
        .filter_map(Value::as_int)
        .collect();
    sums.sort_unstable();
    assert_eq!(sums, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    container.shutdown();
}
