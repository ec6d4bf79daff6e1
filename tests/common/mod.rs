//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from any suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};

pub use rivet::{
    create_proxy, Container, ContainerConfig, DirectHandler, EndpointDescriptor, Error, Fault,
    InterfaceDescriptor, LoopbackTransport, MethodSignature, ObjectServer, Proxy, Result,
    TypeName, TypeRegistry, Value,
};

static INIT_TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn ty(name: &str) -> TypeName {
    TypeName::new(name).unwrap()
}

/// `Calculator { add(i64, i64) -> i64, div(i64, i64) -> i64, describe() -> string }`
pub fn calculator_interface() -> InterfaceDescriptor {
    InterfaceDescriptor::new("Calculator")
        .with_method(MethodSignature::new("add", vec![ty("i64"), ty("i64")], ty("i64")))
        .with_method(MethodSignature::new("div", vec![ty("i64"), ty("i64")], ty("i64")))
        .with_method(MethodSignature::new("describe", vec![], ty("string")))
}

/// In-process calculator component. `div` by zero raises a `DivideByZero` fault.
pub fn calculator(method: &str, args: Vec<Value>) -> Result<Value> {
    let int = |i: usize| args.get(i).and_then(Value::as_int).unwrap_or(0);
    match method {
        "add" => Ok(Value::Int(int(0) + int(1))),
        "div" if int(1) == 0 => Err(Error::Fault(Fault::new("DivideByZero", "divisor is zero"))),
        "div" => Ok(Value::Int(int(0) / int(1))),
        "describe" => Ok(Value::from("calculator")),
        other => Err(Error::Fault(Fault::new("NoSuchMethod", other))),
    }
}

/// Local calculator proxy over a `DirectHandler`
pub fn local_calculator() -> Proxy {
    create_proxy(
        calculator_interface(),
        Arc::new(DirectHandler::new(Arc::new(calculator))),
    )
}

/// Start a peer at `uri` exporting the calculator as `"Calculator"`.
pub fn start_calculator_peer(transport: &LoopbackTransport, uri: &str) -> Arc<ObjectServer> {
    let server = Arc::new(ObjectServer::new(Arc::new(TypeRegistry::new())));
    server.export("Calculator", local_calculator()).unwrap();
    transport.register(EndpointDescriptor::parse(uri).unwrap(), Arc::clone(&server));
    server
}
