//! Location-transparent dispatch for rivet
//!
//! Callers hold a [`Proxy`]; every call goes through an [`InvocationHandler`]:
//! - [`DirectHandler`]: call a component in this process
//! - [`DelegatingHandler`]: forward to a delegate that can be swapped at runtime
//! - [`RemoteHandler`]: encode the call, ship it over a [`Transport`], decode the reply
//!
//! The receiving side is an [`ObjectServer`]; [`LoopbackTransport`] connects
//! the two inside one process. [`RemoteProxyProvider`] plugs remote proxies
//! into a naming scope.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod delegating;
pub mod direct;
pub mod interface;
pub mod loopback;
pub mod provider;
pub mod proxy;
pub mod remote;
pub mod server;

pub use delegating::DelegatingHandler;
pub use direct::{DirectHandler, LocalTarget};
pub use interface::{InterfaceDescriptor, MethodSignature};
pub use loopback::LoopbackTransport;
pub use provider::RemoteProxyProvider;
pub use proxy::{create_proxy, InvocationHandler, Proxy, ProxyIdentity};
pub use remote::{RemoteHandler, RemoteRequest, RemoteResponse, Transport, TransportError};
pub use server::{ObjectServer, SYSTEM_FAULT};
