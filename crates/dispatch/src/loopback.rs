//! In-process transport
//!
//! Routes encoded frames straight to the [`ObjectServer`] registered for an
//! endpoint. Frames are still fully encoded and decoded, so a loopback call
//! exercises the same path as a networked one.

use crate::remote::{Transport, TransportError};
use crate::server::ObjectServer;
use dashmap::DashMap;
use rivet_core::EndpointDescriptor;
use std::sync::Arc;
use tracing::{debug, info};

/// Transport delivering frames to servers in this process.
#[derive(Default)]
pub struct LoopbackTransport {
    servers: DashMap<EndpointDescriptor, Arc<ObjectServer>>,
}

impl LoopbackTransport {
    /// Transport with no servers registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `endpoint` with `server`. Returns the server previously registered there.
    pub fn register(&self, endpoint: EndpointDescriptor, server: Arc<ObjectServer>) -> Option<Arc<ObjectServer>> {
        info!(endpoint = %endpoint, "loopback endpoint registered");
        self.servers.insert(endpoint, server)
    }

    /// Stop serving `endpoint`
    pub fn deregister(&self, endpoint: &EndpointDescriptor) -> Option<Arc<ObjectServer>> {
        self.servers.remove(endpoint).map(|(_, s)| s)
    }

    /// True if a server is registered for `endpoint`
    pub fn is_registered(&self, endpoint: &EndpointDescriptor) -> bool {
        self.servers.contains_key(endpoint)
    }

    fn server(&self, endpoint: &EndpointDescriptor) -> Result<Arc<ObjectServer>, TransportError> {
        self.servers
            .get(endpoint)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| TransportError::Unreachable(endpoint.to_uri()))
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self, endpoint: &EndpointDescriptor) -> Result<(), TransportError> {
        self.server(endpoint).map(|_| ())
    }

    fn round_trip(&self, endpoint: &EndpointDescriptor, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let server = self.server(endpoint)?;
        debug!(endpoint = %endpoint, bytes = request.len(), "loopback frame");
        Ok(server.handle(request))
    }
}
