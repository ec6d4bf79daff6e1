//! In-process invocation
//!
//! [`DirectHandler`] calls a [`LocalTarget`] on the caller's thread. It can be
//! invalidated when the component is undeployed, after which every call
//! fails with `InvalidReference`.
//!
//! In copy mode arguments and results go through a MessagePack encode/decode
//! cycle, so a local call sees exactly what a remote one would.

use crate::interface::MethodSignature;
use crate::proxy::{InvocationHandler, ProxyIdentity};
use rivet_core::{Error, Result, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A component living in this process.
pub trait LocalTarget: Send + Sync {
    /// Run `method` with `args`
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value>;
}

impl<F> LocalTarget for F
where
    F: Fn(&str, Vec<Value>) -> Result<Value> + Send + Sync,
{
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self(method, args)
    }
}

/// Handler that calls a local component directly.
pub struct DirectHandler {
    target: Arc<dyn LocalTarget>,
    copy_values: bool,
    valid: AtomicBool,
}

impl DirectHandler {
    /// Handler passing values through unchanged
    pub fn new(target: Arc<dyn LocalTarget>) -> Self {
        DirectHandler {
            target,
            copy_values: false,
            valid: AtomicBool::new(true),
        }
    }

    /// Enable or disable copy mode
    pub fn with_copy_values(mut self, copy: bool) -> Self {
        self.copy_values = copy;
        self
    }

    /// True if copy mode is on
    pub fn copies_values(&self) -> bool {
        self.copy_values
    }

    /// Mark the target gone; later calls fail with `InvalidReference`
    pub fn invalidate(&self) {
        if self.valid.swap(false, Ordering::AcqRel) {
            debug!("direct handler invalidated");
        }
    }

    /// False once invalidated
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }
}

impl InvocationHandler for DirectHandler {
    fn invoke(
        &self,
        proxy: &ProxyIdentity,
        method: &MethodSignature,
        args: Vec<Value>,
    ) -> Result<Value> {
        if !self.is_valid() {
            return Err(Error::InvalidReference(proxy.to_string()));
        }

        if !self.copy_values {
            return self.target.call(method.name(), args);
        }

        let args = copy_through_wire(&args)?;
        let result = self.target.call(method.name(), args)?;
        copy_through_wire(&result)
    }
}

fn copy_through_wire<T: Serialize + DeserializeOwned>(value: &T) -> Result<T> {
    let bytes = rmp_serde::to_vec(value)?;
    Ok(rmp_serde::from_slice(&bytes)?)
}
