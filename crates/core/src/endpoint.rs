//! Remote endpoint identity
//!
//! An [`EndpointDescriptor`] is the normalized `(scheme, host, port)` of a
//! remote peer. It is parsed once from a URI and never changes afterwards.
//! Path, query and fragment are not part of the identity and are dropped.
//!
//! ## Schemes
//!
//! | Scheme  | Default port |
//! |---------|--------------|
//! | `rpc`   | none         |
//! | `rpcs`  | none         |
//! | `http`  | 80           |
//! | `https` | 443          |
//!
//! The canonical form is always `scheme://host:port`, so
//! `parse(d.to_uri()) == d` for every parsed descriptor.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Supported endpoint schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain binary RPC
    Rpc,
    /// Binary RPC over TLS
    Rpcs,
    /// HTTP tunnel
    Http,
    /// HTTPS tunnel
    Https,
}

impl Scheme {
    /// Lowercase scheme name as it appears in a URI
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Rpc => "rpc",
            Scheme::Rpcs => "rpcs",
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Port used when the URI omits one
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Scheme::Rpc | Scheme::Rpcs => None,
            Scheme::Http => Some(80),
            Scheme::Https => Some(443),
        }
    }

    /// Whether the scheme runs over TLS
    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Rpcs | Scheme::Https)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "rpc" => Some(Scheme::Rpc),
            "rpcs" => Some(Scheme::Rpcs),
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of a remote peer.
///
/// Equality and hashing use the normalized triple only, so two descriptors
/// parsed from differently spelled URIs for the same peer compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl EndpointDescriptor {
    /// Parse a URI into an endpoint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if the URI is malformed, has no host, has no
    /// port and its scheme has no default, or uses an unsupported scheme.
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_endpoint(uri, "URI must not be empty"));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| Error::invalid_endpoint(uri, format!("malformed URI: {}", e)))?;

        let scheme = Scheme::from_name(url.scheme()).ok_or_else(|| {
            Error::invalid_endpoint(uri, format!("unsupported scheme '{}'", url.scheme()))
        })?;

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => return Err(Error::invalid_endpoint(uri, "missing host")),
        };

        let port = url
            .port()
            .or_else(|| scheme.default_port())
            .ok_or_else(|| Error::invalid_endpoint(uri, "missing port"))?;
        if port == 0 {
            return Err(Error::invalid_endpoint(uri, "port 0 is not addressable"));
        }

        Ok(EndpointDescriptor { scheme, host, port })
    }

    /// Scheme of the endpoint
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Lowercased host (IPv6 literals keep their brackets)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port, explicit or defaulted from the scheme
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Canonical URI string, the exact inverse of [`parse`](Self::parse)
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl FromStr for EndpointDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EndpointDescriptor::parse(s)
    }
}

// Only the canonical URI crosses the wire; it is re-parsed on arrival.
impl Serialize for EndpointDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for EndpointDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        EndpointDescriptor::parse(&uri).map_err(serde::de::Error::custom)
    }
}
