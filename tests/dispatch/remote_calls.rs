//! Remote calls through named references

use crate::common::*;
use rivet::{
    NamingScope, RemoteError, RemoteErrorKind, RemoteHandler, RemoteProxyProvider,
    ResolutionStrategy, Transport, TransportError,
};
use std::error::Error as _;
use std::sync::Arc;

const PEER: &str = "rpc://calc.internal:4201";

fn bind_remote(scope: &NamingScope, transport: &Arc<LoopbackTransport>, name: &str, object: &str) {
    let provider = RemoteProxyProvider::new(
        EndpointDescriptor::parse(PEER).unwrap(),
        object,
        calculator_interface(),
        Arc::clone(transport) as Arc<dyn Transport>,
        Arc::new(TypeRegistry::new()),
    );
    scope.bind(name, ResolutionStrategy::provider(provider)).unwrap();
}

fn remote_calculator(transport: &Arc<LoopbackTransport>, object: &str) -> Proxy {
    create_proxy(
        calculator_interface(),
        Arc::new(RemoteHandler::new(
            EndpointDescriptor::parse(PEER).unwrap(),
            object,
            Arc::clone(transport) as Arc<dyn Transport>,
            Arc::new(TypeRegistry::new()),
        )),
    )
}

#[test]
fn lookup_and_call_remote_component() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, PEER);

    let scope = NamingScope::new();
    bind_remote(&scope, &transport, "java:global/Calculator", "Calculator");

    let calc = scope.lookup_as::<Proxy>("java:global/Calculator").unwrap();
    assert_eq!(calc.identity().interface(), "Calculator");
    assert_eq!(
        calc.invoke("add", Some(vec![Value::Int(2), Value::Int(40)])).unwrap(),
        Value::Int(42)
    );
    assert_eq!(
        calc.invoke("describe", None).unwrap(),
        Value::from("calculator")
    );

    // Second lookup hands back the cached proxy
    let again = scope.lookup_as::<Proxy>("global/Calculator").unwrap();
    assert!(Arc::ptr_eq(&calc, &again));
}

#[test]
fn application_fault_reaches_caller_intact() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, PEER);
    let calc = remote_calculator(&transport, "Calculator");

    let err = calc
        .invoke("div", Some(vec![Value::Int(1), Value::Int(0)]))
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::ApplicationFault));
    match err {
        Error::Remote(RemoteError::ApplicationFault { endpoint, fault }) => {
            assert_eq!(endpoint, "rpc://calc.internal:4201");
            assert_eq!(fault, Fault::new("DivideByZero", "divisor is zero"));
        }
        other => panic!("Wrong error: {:?}", other),
    }
}

#[test]
fn unknown_export_is_protocol_fault() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, PEER);
    let ghost = remote_calculator(&transport, "Abacus");

    let err = ghost
        .invoke("add", Some(vec![Value::Int(1), Value::Int(1)]))
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::ProtocolFault));
}

#[test]
fn vanished_peer_is_send_failure() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    start_calculator_peer(&transport, PEER);
    let calc = remote_calculator(&transport, "Calculator");
    assert!(calc.invoke("describe", None).is_ok());

    transport.deregister(&EndpointDescriptor::parse(PEER).unwrap());

    let err = calc.invoke("describe", None).unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::SendFailed));
    let cause = err
        .source()
        .and_then(|s| s.source())
        .and_then(|s| s.downcast_ref::<TransportError>());
    assert!(matches!(cause, Some(TransportError::Unreachable(_))));
}

#[test]
fn unreachable_peer_fails_resolution_then_recovers() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    let scope = NamingScope::new();
    bind_remote(&scope, &transport, "ejb/Calculator", "Calculator");

    assert!(matches!(
        scope.lookup("ejb/Calculator"),
        Err(Error::Resolution { .. })
    ));

    // Default policy retries, so a peer that comes up later is picked up
    start_calculator_peer(&transport, PEER);
    let calc = scope.lookup_as::<Proxy>("ejb/Calculator").unwrap();
    assert_eq!(
        calc.invoke("add", Some(vec![Value::Int(1), Value::Int(2)])).unwrap(),
        Value::Int(3)
    );
}

#[test]
fn local_errors_are_caught_before_sending() {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    let server = start_calculator_peer(&transport, PEER);
    let calc = remote_calculator(&transport, "Calculator");

    assert!(matches!(
        calc.invoke("mul", Some(vec![Value::Int(1), Value::Int(2)])),
        Err(Error::UnknownMethod { .. })
    ));
    assert!(matches!(
        calc.invoke("add", Some(vec![Value::Int(1)])),
        Err(Error::ArityMismatch { expected: 2, actual: 1, .. })
    ));

    server.unexport("Calculator");
    assert_eq!(
        calc.invoke("describe", None).unwrap_err().remote_kind(),
        Some(RemoteErrorKind::ProtocolFault)
    );
}
