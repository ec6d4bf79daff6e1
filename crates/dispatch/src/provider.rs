//! Connection provider for remote references
//!
//! [`RemoteProxyProvider`] is bound into a naming scope as a reference
//! strategy. On first lookup it checks that the endpoint is reachable and
//! hands back a [`Proxy`] over a [`RemoteHandler`].

use crate::interface::InterfaceDescriptor;
use crate::proxy::{create_proxy, Proxy};
use crate::remote::{RemoteHandler, Transport};
use rivet_core::{EndpointDescriptor, TypeRegistry};
use rivet_naming::{ConnectionProvider, ProviderError, Target};
use std::sync::Arc;
use tracing::info;

/// Mints proxies for one object exported at one endpoint.
pub struct RemoteProxyProvider {
    endpoint: EndpointDescriptor,
    object: String,
    interface: Arc<InterfaceDescriptor>,
    transport: Arc<dyn Transport>,
    types: Arc<TypeRegistry>,
}

impl RemoteProxyProvider {
    /// Provider for `object` implementing `interface` at `endpoint`
    pub fn new(
        endpoint: EndpointDescriptor,
        object: impl Into<String>,
        interface: impl Into<Arc<InterfaceDescriptor>>,
        transport: Arc<dyn Transport>,
        types: Arc<TypeRegistry>,
    ) -> Self {
        RemoteProxyProvider {
            endpoint,
            object: object.into(),
            interface: interface.into(),
            transport,
            types,
        }
    }

    /// Endpoint proxies are bound to
    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    /// Build a proxy without checking reachability
    pub fn proxy(&self) -> Proxy {
        let handler = RemoteHandler::new(
            self.endpoint.clone(),
            self.object.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.types),
        );
        create_proxy(Arc::clone(&self.interface), Arc::new(handler))
    }
}

impl ConnectionProvider for RemoteProxyProvider {
    fn connect(&self, name: &str) -> Result<Target, ProviderError> {
        self.transport.connect(&self.endpoint)?;
        let proxy = self.proxy();
        info!(name, endpoint = %self.endpoint, object = %self.object, "remote reference connected");
        Ok(Arc::new(proxy))
    }
}
