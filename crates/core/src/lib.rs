//! Core types for rivet
//!
//! This crate defines the foundational types shared by every other crate:
//! - Error: error taxonomy for naming, dispatch, envelopes, endpoints, tasks
//! - Value: dynamic argument/return value
//! - TypeName / TypeRegistry: declared types and the receiver's type universe
//! - Envelope: payload tagged with its declared type
//! - EndpointDescriptor: normalized identity of a remote peer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod types;
pub mod value;

pub use endpoint::{EndpointDescriptor, Scheme};
pub use envelope::Envelope;
pub use error::{Cause, Error, Fault, RemoteError, RemoteErrorKind, Result};
pub use types::{TypeDescriptor, TypeName, TypeRegistry, ANY, MAX_TYPE_NAME_LENGTH};
pub use value::{Value, ValueKind};
