//! Container facade
//!
//! A [`Container`] owns one naming scope, one task runtime and one type
//! registry, and binds the `[[remote]]` references from its configuration.
//! Interfaces named by remote references are looked up in the container's
//! interface table when the reference first resolves, so they may be
//! registered after `open`.

use crate::config::{ContainerConfig, CONFIG_FILE_NAME};
use parking_lot::RwLock;
use rivet_core::{EndpointDescriptor, Error, Result, TypeRegistry};
use rivet_dispatch::{InterfaceDescriptor, Proxy, RemoteProxyProvider, Transport};
use rivet_naming::{ConnectionProvider, NamedReference, NamingScope, ProviderError, ResolutionStrategy, Target};
use rivet_runtime::ManagedTaskRuntime;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

type InterfaceTable = Arc<RwLock<HashMap<String, Arc<InterfaceDescriptor>>>>;

/// Component container wiring naming, dispatch and the task runtime together.
pub struct Container {
    config: ContainerConfig,
    naming: NamingScope,
    runtime: ManagedTaskRuntime,
    types: Arc<TypeRegistry>,
    transport: Arc<dyn Transport>,
    interfaces: InterfaceTable,
}

impl Container {
    /// Open a container from a validated configuration.
    ///
    /// Starts the task runtime and binds every `[[remote]]` entry. Remote
    /// references are not connected until first lookup.
    ///
    /// # Errors
    ///
    /// `Config` for invalid settings, `AlreadyBound` for duplicate remote names.
    pub fn open(config: ContainerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let naming = NamingScope::with_prefixes(config.naming.prefixes.iter().cloned())
            .with_default_policy(config.naming.failure_policy()?);
        let runtime = ManagedTaskRuntime::with_policy(
            config.executor.runtime_config()?,
            config.executor.rejection_policy()?,
        )?;

        let container = Container {
            config,
            naming,
            runtime,
            types: Arc::new(TypeRegistry::new()),
            transport,
            interfaces: Arc::new(RwLock::new(HashMap::new())),
        };

        for remote in &container.config.remote {
            let provider = ConfiguredRemote {
                endpoint: remote.endpoint()?,
                object: remote.object.clone(),
                interface: remote.interface.clone(),
                interfaces: Arc::clone(&container.interfaces),
                transport: Arc::clone(&container.transport),
                types: Arc::clone(&container.types),
            };
            container
                .naming
                .bind(&remote.name, ResolutionStrategy::provider(provider))?;
            debug!(name = %remote.name, uri = %remote.uri, "remote reference bound from config");
        }

        info!(
            remotes = container.config.remote.len(),
            workers = container.config.executor.worker_threads,
            "container opened"
        );
        Ok(container)
    }

    /// Open a container configured by `rivet.toml` in `dir`, writing a
    /// default file first if there is none.
    pub fn open_dir(dir: &Path, transport: Arc<dyn Transport>) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        ContainerConfig::write_default_if_missing(&path)?;
        let config = ContainerConfig::from_file(&path)?;
        Self::open(config, transport)
    }

    /// Make an interface available to configured remote references.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if an interface of the same name is registered.
    pub fn register_interface(&self, interface: InterfaceDescriptor) -> Result<()> {
        let mut table = self.interfaces.write();
        if table.contains_key(interface.name()) {
            return Err(Error::AlreadyBound(interface.name().to_string()));
        }
        debug!(interface = interface.name(), "interface registered");
        table.insert(interface.name().to_string(), Arc::new(interface));
        Ok(())
    }

    /// Registered interface by name
    pub fn interface(&self, name: &str) -> Option<Arc<InterfaceDescriptor>> {
        self.interfaces.read().get(name).cloned()
    }

    /// Bind `name` to `object` exported at `uri`.
    ///
    /// # Errors
    ///
    /// `InvalidEndpoint` for a bad URI; `AlreadyBound`/`InvalidName` from the scope.
    pub fn bind_remote(
        &self,
        name: &str,
        uri: &str,
        object: &str,
        interface: impl Into<Arc<InterfaceDescriptor>>,
    ) -> Result<Arc<NamedReference>> {
        let endpoint = EndpointDescriptor::parse(uri)?;
        let provider = RemoteProxyProvider::new(
            endpoint,
            object,
            interface,
            Arc::clone(&self.transport),
            Arc::clone(&self.types),
        );
        self.naming.bind(name, ResolutionStrategy::provider(provider))
    }

    /// Look up a name bound to a proxy.
    ///
    /// # Errors
    ///
    /// As `NamingScope::lookup_as`.
    pub fn lookup_proxy(&self, name: &str) -> Result<Arc<Proxy>> {
        self.naming.lookup_as::<Proxy>(name)
    }

    /// The container's naming scope
    pub fn naming(&self) -> &NamingScope {
        &self.naming
    }

    /// The container's task runtime
    pub fn runtime(&self) -> &ManagedTaskRuntime {
        &self.runtime
    }

    /// The container's type registry
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Transport used by remote references
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Configuration the container was opened with
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Stop the task runtime. Idempotent.
    pub fn shutdown(&self) {
        self.runtime.shutdown();
        info!("container shut down");
    }
}

/// Remote reference from `[[remote]]`; the interface is looked up on connect.
struct ConfiguredRemote {
    endpoint: EndpointDescriptor,
    object: String,
    interface: String,
    interfaces: InterfaceTable,
    transport: Arc<dyn Transport>,
    types: Arc<TypeRegistry>,
}

impl ConnectionProvider for ConfiguredRemote {
    fn connect(&self, name: &str) -> std::result::Result<Target, ProviderError> {
        let interface = self
            .interfaces
            .read()
            .get(&self.interface)
            .cloned()
            .ok_or_else(|| Error::UnknownType(self.interface.clone()))?;

        RemoteProxyProvider::new(
            self.endpoint.clone(),
            self.object.clone(),
            interface,
            Arc::clone(&self.transport),
            Arc::clone(&self.types),
        )
        .connect(name)
    }
}
