//! Swappable handler chain
//!
//! [`DelegatingHandler`] forwards to whatever delegate is currently set. The
//! delegate is cloned out of the lock when a call starts, so swapping it never
//! affects calls already in flight and never waits for them.

use crate::interface::MethodSignature;
use crate::proxy::{InvocationHandler, ProxyIdentity};
use parking_lot::RwLock;
use rivet_core::{Error, Result, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Handler that forwards to a replaceable delegate.
pub struct DelegatingHandler {
    name: String,
    delegate: RwLock<Option<Arc<dyn InvocationHandler>>>,
}

impl DelegatingHandler {
    /// Unbound handler; every call fails with `NoHandlerBound` until a delegate is set
    pub fn new(name: impl Into<String>) -> Self {
        DelegatingHandler {
            name: name.into(),
            delegate: RwLock::new(None),
        }
    }

    /// Handler bound to `delegate`
    pub fn with_delegate(name: impl Into<String>, delegate: Arc<dyn InvocationHandler>) -> Self {
        DelegatingHandler {
            name: name.into(),
            delegate: RwLock::new(Some(delegate)),
        }
    }

    /// Name reported in `NoHandlerBound`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the delegate. Returns the previous one.
    pub fn set_delegate(&self, delegate: Arc<dyn InvocationHandler>) -> Option<Arc<dyn InvocationHandler>> {
        let previous = self.delegate.write().replace(delegate);
        info!(handler = %self.name, replaced = previous.is_some(), "delegate set");
        previous
    }

    /// Remove the delegate. Returns the previous one.
    pub fn clear_delegate(&self) -> Option<Arc<dyn InvocationHandler>> {
        let previous = self.delegate.write().take();
        debug!(handler = %self.name, "delegate cleared");
        previous
    }

    /// Current delegate
    pub fn delegate(&self) -> Option<Arc<dyn InvocationHandler>> {
        self.delegate.read().clone()
    }

    /// True if a delegate is set
    pub fn is_bound(&self) -> bool {
        self.delegate.read().is_some()
    }
}

impl InvocationHandler for DelegatingHandler {
    fn invoke(
        &self,
        proxy: &ProxyIdentity,
        method: &MethodSignature,
        args: Vec<Value>,
    ) -> Result<Value> {
        let current = self.delegate();
        match current {
            Some(delegate) => delegate.invoke(proxy, method, args),
            None => Err(Error::NoHandlerBound(self.name.clone())),
        }
    }
}
