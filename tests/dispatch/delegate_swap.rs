//! Swapping a delegate while calls are in flight

use crate::common::*;
use rivet::{DelegatingHandler, InvocationHandler, RemoteHandler, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn named(tag: &'static str) -> Arc<dyn InvocationHandler> {
    Arc::new(DirectHandler::new(Arc::new(
        move |_: &str, _: Vec<Value>| -> Result<Value> { Ok(Value::from(tag)) },
    )))
}

#[test]
fn every_call_sees_exactly_one_delegate() {
    init_tracing();
    let handler = Arc::new(DelegatingHandler::with_delegate("ejb/Calculator", named("blue")));
    let proxy = create_proxy(calculator_interface(), handler.clone());
    let stop = Arc::new(AtomicBool::new(false));

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let proxy = proxy.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while !stop.load(Ordering::Relaxed) {
                    let v = proxy.invoke("describe", None).unwrap();
                    seen.push(v.as_str().unwrap().to_string());
                }
                seen
            })
        })
        .collect();

    for i in 0..200 {
        let tag = if i % 2 == 0 { "green" } else { "blue" };
        handler.set_delegate(named(tag));
    }
    stop.store(true, Ordering::Relaxed);

    for caller in callers {
        for tag in caller.join().unwrap() {
            assert!(tag == "blue" || tag == "green", "unexpected result {}", tag);
        }
    }
}

#[test]
fn failover_from_local_to_remote() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, "rpc://backup:4201");

    let local = Arc::new(DirectHandler::new(Arc::new(calculator)));
    let handler = Arc::new(DelegatingHandler::with_delegate(
        "ejb/Calculator",
        local.clone(),
    ));
    let proxy = create_proxy(calculator_interface(), handler.clone());
    let args = || Some(vec![Value::Int(20), Value::Int(22)]);
    assert_eq!(proxy.invoke("add", args()).unwrap(), Value::Int(42));

    local.invalidate();
    assert!(matches!(
        proxy.invoke("add", args()),
        Err(Error::InvalidReference(_))
    ));

    handler.set_delegate(Arc::new(RemoteHandler::new(
        EndpointDescriptor::parse("rpc://backup:4201").unwrap(),
        "Calculator",
        transport as Arc<dyn Transport>,
        Arc::new(TypeRegistry::new()),
    )));
    assert_eq!(proxy.invoke("add", args()).unwrap(), Value::Int(42));

    handler.clear_delegate();
    assert!(matches!(
        proxy.invoke("add", args()),
        Err(Error::NoHandlerBound(name)) if name == "ejb/Calculator"
    ));
}
