//! Lookup name parsing
//!
//! Names are `/`-separated paths with an optional `prefix:` in front,
//! e.g. `java:comp/env/jdbc/Orders`. Empty components are collapsed and
//! surrounding whitespace is trimmed, so `comp//env/ jdbc ` and
//! `comp/env/jdbc` are the same name.

use rivet_core::{Error, Result};
use std::fmt;

/// A parsed lookup name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupName {
    prefix: Option<String>,
    components: Vec<String>,
}

impl LookupName {
    /// Parse a raw name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the prefix is empty or not alphanumeric, or the
    /// path has no components.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidName {
            name: raw.to_string(),
            reason: reason.to_string(),
        };

        let (prefix, path) = match raw.find(':') {
            Some(idx) => {
                let prefix = raw[..idx].trim();
                if prefix.is_empty() {
                    return Err(invalid("empty prefix"));
                }
                if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(invalid("prefix must be alphanumeric"));
                }
                (Some(prefix.to_string()), &raw[idx + 1..])
            }
            None => (None, raw),
        };

        if path.contains(':') {
            return Err(invalid("only one prefix is allowed"));
        }

        let components: Vec<String> = path
            .split('/')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        if components.is_empty() {
            return Err(invalid("name has no components"));
        }

        Ok(LookupName { prefix, components })
    }

    /// Prefix before the first `:`, if any
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Path components
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Normalized path without prefix, e.g. `comp/env/jdbc/Orders`
    pub fn path(&self) -> String {
        self.components.join("/")
    }

    /// Last component
    pub fn leaf(&self) -> &str {
        // parse() guarantees at least one component
        &self.components[self.components.len() - 1]
    }
}

impl fmt::Display for LookupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}:", prefix)?;
        }
        f.write_str(&self.path())
    }
}
