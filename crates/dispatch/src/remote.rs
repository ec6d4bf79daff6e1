//! Remote dispatch
//!
//! [`RemoteHandler`] turns a proxy call into a [`RemoteRequest`], hands the
//! encoded frame to a [`Transport`] addressed by an [`EndpointDescriptor`],
//! and turns the [`RemoteResponse`] back into a value or an error.
//!
//! ## Format
//!
//! Requests and responses are MessagePack (`rmp-serde`) frames. Every argument
//! and the result travel inside an [`Envelope`] carrying the declared type.
//!
//! ## Failure kinds
//!
//! | Where it failed                      | Error                          |
//! |--------------------------------------|--------------------------------|
//! | transport could not deliver/receive  | `RemoteError::SendFailed`      |
//! | component raised a fault             | `RemoteError::ApplicationFault`|
//! | peer or reply unintelligible         | `RemoteError::ProtocolFault`   |

use crate::interface::MethodSignature;
use crate::proxy::{InvocationHandler, ProxyIdentity};
use rivet_core::{
    Cause, EndpointDescriptor, Envelope, Error, Fault, RemoteError, Result, TypeRegistry, Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One call addressed to an exported object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Export id of the target object on the peer
    pub object: String,
    /// Method name
    pub method: String,
    /// Arguments, each tagged with its declared parameter type
    pub args: Vec<Envelope>,
}

impl RemoteRequest {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Outcome of a remote call as sent back by the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteResponse {
    /// Result tagged with the method's declared return type
    Success(Envelope),
    /// The component raised a fault
    ApplicationFault(Fault),
    /// The peer could not process the request
    ProtocolFault(String),
}

impl RemoteResponse {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Failure below the protocol: the frame did not make it there and back.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Nothing is listening at the endpoint
    #[error("endpoint {0} is unreachable")]
    Unreachable(String),

    /// The connection broke mid-call
    #[error("connection to {endpoint} lost: {reason}")]
    ConnectionLost {
        /// Canonical URI of the endpoint
        endpoint: String,
        /// What happened
        reason: String,
    },

    /// I/O error from the underlying channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Moves encoded frames to a peer and back.
///
/// Timeouts and retries are the transport's business.
pub trait Transport: Send + Sync {
    /// Check that the endpoint can be reached
    fn connect(&self, endpoint: &EndpointDescriptor) -> std::result::Result<(), TransportError>;

    /// Send one request frame and wait for the reply frame
    fn round_trip(
        &self,
        endpoint: &EndpointDescriptor,
        request: &[u8],
    ) -> std::result::Result<Vec<u8>, TransportError>;
}

/// Handler that forwards calls to an object exported by a peer.
pub struct RemoteHandler {
    endpoint: EndpointDescriptor,
    object: String,
    transport: Arc<dyn Transport>,
    types: Arc<TypeRegistry>,
}

impl RemoteHandler {
    /// Handler for `object` exported at `endpoint`.
    ///
    /// `types` is the local type universe replies are checked against.
    pub fn new(
        endpoint: EndpointDescriptor,
        object: impl Into<String>,
        transport: Arc<dyn Transport>,
        types: Arc<TypeRegistry>,
    ) -> Self {
        RemoteHandler {
            endpoint,
            object: object.into(),
            transport,
            types,
        }
    }

    /// Endpoint calls are addressed to
    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    /// Export id of the remote object
    pub fn object(&self) -> &str {
        &self.object
    }
}

impl InvocationHandler for RemoteHandler {
    fn invoke(
        &self,
        _proxy: &ProxyIdentity,
        method: &MethodSignature,
        args: Vec<Value>,
    ) -> Result<Value> {
        if args.len() != method.arity() {
            return Err(Error::ArityMismatch {
                method: method.name().to_string(),
                expected: method.arity(),
                actual: args.len(),
            });
        }

        let request = RemoteRequest {
            object: self.object.clone(),
            method: method.name().to_string(),
            args: method
                .parameter_types()
                .iter()
                .zip(args)
                .map(|(declared, value)| Envelope::wrap(declared, value))
                .collect(),
        };
        let frame = request.to_bytes()?;
        let endpoint = self.endpoint.to_uri();

        debug!(endpoint = %endpoint, object = %self.object, method = method.name(), "remote call");
        let reply = self
            .transport
            .round_trip(&self.endpoint, &frame)
            .map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "remote send failed");
                RemoteError::SendFailed {
                    endpoint: endpoint.clone(),
                    cause: Cause::new(e),
                }
            })?;

        let response = RemoteResponse::from_bytes(&reply).map_err(|e| RemoteError::ProtocolFault {
            endpoint: endpoint.clone(),
            reason: format!("undecodable reply: {}", e),
        })?;

        match response {
            RemoteResponse::Success(envelope) => envelope.unwrap(&self.types, method.return_type()),
            RemoteResponse::ApplicationFault(fault) => {
                Err(RemoteError::ApplicationFault { endpoint, fault }.into())
            }
            RemoteResponse::ProtocolFault(reason) => {
                Err(RemoteError::ProtocolFault { endpoint, reason }.into())
            }
        }
    }
}
