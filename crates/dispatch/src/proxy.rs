//! Proxies and the invocation handler seam
//!
//! A [`Proxy`] is what callers hold: an identity, the interface it implements
//! and the handler every call is forwarded to. The proxy validates the call
//! against the interface; the handler decides where it runs.

use crate::interface::{InterfaceDescriptor, MethodSignature};
use rivet_core::{Error, Result, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Identity of one proxy instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyIdentity {
    interface: String,
    id: Uuid,
}

impl ProxyIdentity {
    /// Fresh identity for a proxy of `interface`
    pub fn new(interface: impl Into<String>) -> Self {
        ProxyIdentity {
            interface: interface.into(),
            id: Uuid::new_v4(),
        }
    }

    /// Interface name
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Instance id
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for ProxyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.interface, self.id)
    }
}

/// Receives every method call made on a proxy.
///
/// `args` has already been checked against `method`'s arity when the call
/// comes through a [`Proxy`].
pub trait InvocationHandler: Send + Sync {
    /// Handle one call
    fn invoke(&self, proxy: &ProxyIdentity, method: &MethodSignature, args: Vec<Value>)
        -> Result<Value>;
}

/// Caller-side handle to a component.
///
/// Cloning a proxy keeps its identity; proxies compare equal by identity.
#[derive(Clone)]
pub struct Proxy {
    identity: ProxyIdentity,
    interface: Arc<InterfaceDescriptor>,
    handler: Arc<dyn InvocationHandler>,
}

impl Proxy {
    /// Proxy identity
    pub fn identity(&self) -> &ProxyIdentity {
        &self.identity
    }

    /// Interface implemented by this proxy
    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    /// Handler calls are forwarded to
    pub fn handler(&self) -> &Arc<dyn InvocationHandler> {
        &self.handler
    }

    /// Call a method.
    ///
    /// `None` arguments are treated as an empty argument list.
    ///
    /// # Errors
    ///
    /// - `UnknownMethod` if the interface has no such method
    /// - `ArityMismatch` if the argument count is wrong
    /// - whatever the handler returns
    pub fn invoke(&self, method: &str, args: Option<Vec<Value>>) -> Result<Value> {
        let args = args.unwrap_or_default();
        let signature = self
            .interface
            .method(method)
            .ok_or_else(|| Error::UnknownMethod {
                interface: self.interface.name().to_string(),
                method: method.to_string(),
            })?;

        if signature.arity() != args.len() {
            return Err(Error::ArityMismatch {
                method: method.to_string(),
                expected: signature.arity(),
                actual: args.len(),
            });
        }

        trace!(proxy = %self.identity, method, "invoke");
        self.handler.invoke(&self.identity, signature, args)
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Proxy {}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Create a proxy for `interface` that forwards every call to `handler`.
pub fn create_proxy(
    interface: impl Into<Arc<InterfaceDescriptor>>,
    handler: Arc<dyn InvocationHandler>,
) -> Proxy {
    let interface = interface.into();
    Proxy {
        identity: ProxyIdentity::new(interface.name()),
        interface,
        handler,
    }
}
