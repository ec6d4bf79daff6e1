//! Receiving side of remote dispatch
//!
//! An [`ObjectServer`] holds exported proxies keyed by object id. It decodes a
//! request frame, checks every argument envelope against its own type
//! registry, invokes the export and encodes the outcome.
//!
//! Errors never escape `handle`: anything that goes wrong becomes a response
//! frame. Component faults (`Error::Fault`) travel back as application
//! faults; other errors raised while running the call are reported as an
//! application fault of kind [`SYSTEM_FAULT`].

use crate::proxy::Proxy;
use crate::remote::{RemoteRequest, RemoteResponse};
use dashmap::DashMap;
use rivet_core::{Envelope, Error, Fault, RemoteError, Result, TypeRegistry};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fault kind for container errors raised while running an exported call
pub const SYSTEM_FAULT: &str = "SystemFault";

/// Table of exported objects served to remote callers.
pub struct ObjectServer {
    types: Arc<TypeRegistry>,
    exports: DashMap<String, Proxy>,
}

impl ObjectServer {
    /// Server checking arguments against `types`
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        ObjectServer {
            types,
            exports: DashMap::new(),
        }
    }

    /// Type registry arguments are unwrapped against
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Export `target` under `object`.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if the id is taken.
    pub fn export(&self, object: impl Into<String>, target: Proxy) -> Result<()> {
        let object = object.into();
        match self.exports.entry(object.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::AlreadyBound(object)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(object = %object, interface = target.interface().name(), "exported");
                slot.insert(target);
                Ok(())
            }
        }
    }

    /// Withdraw an export. Returns the proxy if it was exported.
    pub fn unexport(&self, object: &str) -> Option<Proxy> {
        let removed = self.exports.remove(object).map(|(_, p)| p);
        if removed.is_some() {
            info!(object, "unexported");
        }
        removed
    }

    /// True if `object` is exported
    pub fn is_exported(&self, object: &str) -> bool {
        self.exports.contains_key(object)
    }

    /// Serve one request frame and produce the response frame
    pub fn handle(&self, request: &[u8]) -> Vec<u8> {
        let response = self.dispatch(request);
        match response.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed to encode response");
                RemoteResponse::ProtocolFault(format!("unencodable response: {}", e))
                    .to_bytes()
                    .unwrap_or_default()
            }
        }
    }

    fn dispatch(&self, frame: &[u8]) -> RemoteResponse {
        let request = match RemoteRequest::from_bytes(frame) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "undecodable request");
                return RemoteResponse::ProtocolFault(format!("undecodable request: {}", e));
            }
        };

        // Clone out of the map so the shard lock is not held during the call
        let target = match self.exports.get(&request.object) {
            Some(entry) => entry.value().clone(),
            None => {
                return RemoteResponse::ProtocolFault(format!(
                    "no object exported as '{}'",
                    request.object
                ))
            }
        };

        let signature = match target.interface().method(&request.method) {
            Some(m) => m.clone(),
            None => {
                return RemoteResponse::ProtocolFault(format!(
                    "unknown method '{}' on {}",
                    request.method,
                    target.interface().name()
                ))
            }
        };

        if signature.arity() != request.args.len() {
            return RemoteResponse::ProtocolFault(format!(
                "method '{}' expects {} arguments, got {}",
                request.method,
                signature.arity(),
                request.args.len()
            ));
        }

        let mut args = Vec::with_capacity(request.args.len());
        for (i, (envelope, declared)) in request
            .args
            .into_iter()
            .zip(signature.parameter_types())
            .enumerate()
        {
            match envelope.unwrap(&self.types, declared) {
                Ok(v) => args.push(v),
                Err(e) => return RemoteResponse::ProtocolFault(format!("argument {}: {}", i, e)),
            }
        }

        debug!(object = %request.object, method = %request.method, "dispatching");
        match target.invoke(&request.method, Some(args)) {
            Ok(value) => RemoteResponse::Success(Envelope::wrap(signature.return_type(), value)),
            Err(Error::Fault(fault)) => RemoteResponse::ApplicationFault(fault),
            Err(Error::Remote(RemoteError::ApplicationFault { fault, .. })) => {
                RemoteResponse::ApplicationFault(fault)
            }
            Err(other) => {
                warn!(object = %request.object, method = %request.method, error = %other, "exported call failed");
                RemoteResponse::ApplicationFault(Fault::new(SYSTEM_FAULT, other.to_string()))
            }
        }
    }
}
