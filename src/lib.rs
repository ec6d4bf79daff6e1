//! Rivet - named references, location-transparent dispatch and a managed task runtime
//!
//! Components are reached through names. A name resolves lazily to a proxy;
//! every call on the proxy goes through an invocation handler that may run
//! the component in process, forward to a swappable delegate, or ship the
//! call to a peer. Background work runs on a bounded runtime that tells each
//! task's listener when the task is refused.
//!
//! # Quick Start
//!
//! ```ignore
//! use rivet::{Container, ContainerConfig, LoopbackTransport};
//! use std::sync::Arc;
//!
//! let container = Container::open(ContainerConfig::default(), Arc::new(LoopbackTransport::new()))?;
//! container.bind_remote("java:global/Calculator", "rpc://calc:4201", "Calculator", calculator_iface)?;
//!
//! let calc = container.lookup_proxy("java:global/Calculator")?;
//! let sum = calc.invoke("add", Some(vec![2.into(), 3.into()]))?;
//! ```
//!
//! # Crates
//!
//! - `rivet-core`: errors, values, types, envelopes, endpoints
//! - `rivet-naming`: naming scopes and lazily resolved references
//! - `rivet-dispatch`: proxies, invocation handlers, remote dispatch
//! - `rivet-runtime`: the managed task runtime

pub mod config;
pub mod container;

pub use config::{ContainerConfig, ExecutorConfig, NamingConfig, RemoteConfig, CONFIG_FILE_NAME};
pub use container::Container;

pub use rivet_core::{
    Cause, EndpointDescriptor, Envelope, Error, Fault, RemoteError, RemoteErrorKind, Result,
    Scheme, TypeDescriptor, TypeName, TypeRegistry, Value, ValueKind,
};
pub use rivet_dispatch::{
    create_proxy, DelegatingHandler, DirectHandler, InterfaceDescriptor, InvocationHandler,
    LocalTarget, LoopbackTransport, MethodSignature, ObjectServer, Proxy, ProxyIdentity,
    RemoteHandler, RemoteProxyProvider, Transport, TransportError,
};
pub use rivet_naming::{
    AliasCycle, Binding, ConnectionProvider, FailurePolicy, LookupName, NamedReference,
    NamingScope, ProviderError, ResolutionStrategy, Target,
};
pub use rivet_runtime::{
    AbortPolicy, CallerRunsPolicy, DiscardPolicy, ManagedTaskRuntime, RejectedTask,
    RejectionCause, RejectionPolicy, RuntimeConfig, RuntimeStats, ShutdownPolicy, TaskHandle,
    TaskInfo, TaskListener, TaskState,
};
