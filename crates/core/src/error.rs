//! Error types for rivet
//!
//! Every failure surfaced by naming, dispatch, envelope handling, endpoint
//! parsing and the task runtime is one variant of [`Error`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors are `Clone` so a single resolution failure can be handed to every
//! waiter of that attempt. Underlying causes are kept behind an `Arc` and stay
//! reachable through [`std::error::Error::source`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

/// Shared, type-erased cause attached to wrapping errors.
///
/// Derefs to the inner error so `source()` yields the original cause rather
/// than the `Arc` wrapping it.
#[derive(Clone)]
pub struct Cause(Arc<dyn std::error::Error + Send + Sync>);

impl Cause {
    /// Wrap an error (or message) as a shared cause
    pub fn new(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Cause(Arc::from(cause.into()))
    }

    /// True if both causes point at the same underlying error
    pub fn ptr_eq(a: &Cause, b: &Cause) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for Cause {
    type Target = dyn std::error::Error + Send + Sync;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// Result type alias for rivet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level fault raised by an invoked component.
///
/// Faults are plain data so they can cross a process boundary unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Fault category chosen by the component (e.g. "InsufficientFunds")
    pub kind: String,
    /// Human-readable detail
    pub message: String,
}

impl Fault {
    /// Create a new fault
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Fault {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Which side of a remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The request never reached the peer, or no reply came back
    SendFailed,
    /// The peer ran the call and the component raised a fault
    ApplicationFault,
    /// The peer could not understand the request, or its reply was garbage
    ProtocolFault,
}

/// Failure of a call dispatched through a remote handler.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Transport could not deliver the request or receive the reply
    #[error("send to {endpoint} failed: {cause}")]
    SendFailed {
        /// Canonical URI of the addressed endpoint
        endpoint: String,
        /// Transport failure
        #[source]
        cause: Cause,
    },

    /// Peer returned an application fault raised by the target component
    #[error("peer {endpoint} returned application fault: {fault}")]
    ApplicationFault {
        /// Canonical URI of the addressed endpoint
        endpoint: String,
        /// Fault raised by the component
        fault: Fault,
    },

    /// Peer returned, or we received, a malformed or unintelligible message
    #[error("protocol fault with {endpoint}: {reason}")]
    ProtocolFault {
        /// Canonical URI of the addressed endpoint
        endpoint: String,
        /// What went wrong
        reason: String,
    },
}

impl RemoteError {
    /// Discriminant of this failure
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            RemoteError::SendFailed { .. } => RemoteErrorKind::SendFailed,
            RemoteError::ApplicationFault { .. } => RemoteErrorKind::ApplicationFault,
            RemoteError::ProtocolFault { .. } => RemoteErrorKind::ProtocolFault,
        }
    }
}

/// Error types for rivet
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No binding exists under the name
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// Name is syntactically invalid or uses an unknown prefix
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A binding already exists under the name
    #[error("Name already bound: {0}")]
    AlreadyBound(String),

    /// A reference could not be resolved to its target
    #[error("Failed to resolve '{name}': {cause}")]
    Resolution {
        /// Name of the reference being resolved
        name: String,
        /// Underlying failure (provider error, alias cycle, connect failure, ...)
        #[source]
        cause: Cause,
    },

    /// Invocation reached a handler chain with no delegate configured
    #[error("No invocation handler bound for {0}")]
    NoHandlerBound(String),

    /// Method is not part of the proxied interface
    #[error("Unknown method '{method}' on interface {interface}")]
    UnknownMethod {
        /// Interface name
        interface: String,
        /// Requested method
        method: String,
    },

    /// Wrong number of arguments for the method
    #[error("Method '{method}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Method name
        method: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// The referenced component is gone (invalidated or undeployed)
    #[error("Reference is invalid: {0}")]
    InvalidReference(String),

    /// Fault raised by an in-process component
    #[error("Application fault: {0}")]
    Fault(Fault),

    /// Remote dispatch failure
    #[error("Remote invocation failed: {0}")]
    Remote(#[from] RemoteError),

    /// Envelope type is not assignable to the expected type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type the receiver asked for
        expected: String,
        /// Type that was supplied
        actual: String,
    },

    /// Type name cannot be resolved in the receiver's type universe
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Type name is registered twice
    #[error("Type already registered: {0}")]
    DuplicateType(String),

    /// URI cannot be turned into an endpoint
    #[error("Invalid endpoint '{uri}': {reason}")]
    InvalidEndpoint {
        /// Input URI
        uri: String,
        /// Why it was rejected
        reason: String,
    },

    /// Task was refused by the managed runtime
    #[error("Task {task} rejected: {reason}")]
    TaskRejected {
        /// Runtime-assigned task id
        task: u64,
        /// Rejection cause
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a resolution error wrapping `cause`
    pub fn resolution(
        name: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Resolution {
            name: name.into(),
            cause: Cause::new(cause),
        }
    }

    /// Build an invalid-endpoint error
    pub fn invalid_endpoint(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidEndpoint {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Build a type-mismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Remote failure kind, if this is a remote error
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Error::Remote(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
