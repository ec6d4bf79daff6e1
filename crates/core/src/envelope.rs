//! Typed envelope for values crossing a process boundary
//!
//! An [`Envelope`] pairs a payload with the sender's *declared* static type so
//! the receiver can pick a decoder without relying on the wire format to
//! carry type information. The type name is always present, including for
//! null payloads.
//!
//! ## Format
//!
//! Envelopes are encoded with MessagePack (`rmp-serde`) when framed on their
//! own; remote requests embed them inside a larger frame.

use crate::error::{Error, Result};
use crate::types::{TypeName, TypeRegistry};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A payload tagged with its declared type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    type_name: TypeName,
    payload: Value,
}

impl Envelope {
    /// Wrap a value under its declared static type.
    pub fn wrap(declared: &TypeName, value: Value) -> Self {
        Envelope {
            type_name: declared.clone(),
            payload: value,
        }
    }

    /// Declared type of the payload
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Payload, possibly `Null`
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Unwrap the payload for a receiver expecting `expected`.
    ///
    /// # Errors
    ///
    /// - `UnknownType` if the envelope's type name (or `expected`) is not in
    ///   the receiver's registry
    /// - `TypeMismatch` if the declared type is not assignable to `expected`,
    ///   or the payload's shape contradicts the declared type
    pub fn unwrap(self, registry: &TypeRegistry, expected: &TypeName) -> Result<Value> {
        if !registry.is_assignable(&self.type_name, expected)? {
            return Err(Error::type_mismatch(
                expected.as_str(),
                self.type_name.as_str(),
            ));
        }
        registry.check_payload(&self.type_name, &self.payload)?;
        Ok(self.payload)
    }

    /// Split into declared type and payload without any checks
    pub fn into_parts(self) -> (TypeName, Value) {
        (self.type_name, self.payload)
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
