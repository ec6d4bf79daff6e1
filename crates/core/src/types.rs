//! Declared type names and the receiver-side type universe
//!
//! - TypeName: validated canonical name of a declared static type
//! - TypeDescriptor: a registered type, its optional value shape and supertypes
//! - TypeRegistry: the set of types a receiver can decode, with assignability
//!
//! ## Validation
//!
//! Type names must:
//! - Be 1-512 characters
//! - Contain only alphanumeric, underscore, dot, colon, dollar
//! - Start with a letter or underscore

use crate::error::{Error, Result};
use crate::value::{Value, ValueKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Maximum length of a type name
pub const MAX_TYPE_NAME_LENGTH: usize = 512;

/// Root of the type universe; every type is assignable to it.
pub const ANY: &str = "any";

/// Canonical name of a declared static type.
///
/// ## Examples
///
/// Valid names:
/// - "i64"
/// - "billing.Invoice"
/// - "billing::Invoice$Line"
///
/// Invalid names:
/// - "" (empty)
/// - "9lives"
/// - "has spaces"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Create a new TypeName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(TypeName(name))
    }

    /// Validate a type name
    pub fn validate(name: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidName {
            name: name.to_string(),
            reason,
        };

        let first = match name.chars().next() {
            Some(c) => c,
            None => return Err(invalid("type name cannot be empty".to_string())),
        };

        if name.len() > MAX_TYPE_NAME_LENGTH {
            return Err(invalid(format!(
                "type name too long: {} chars (max {})",
                name.len(),
                MAX_TYPE_NAME_LENGTH
            )));
        }

        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(invalid(format!(
                "type name cannot start with '{}'",
                first
            )));
        }

        for (pos, ch) in name.chars().enumerate() {
            if !Self::is_valid_char(ch) {
                return Err(invalid(format!(
                    "invalid character '{}' at position {}",
                    ch, pos
                )));
            }
        }

        Ok(())
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '$')
    }

    /// Get the name as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TypeName::new(value)
    }
}

impl TryFrom<&str> for TypeName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        TypeName::new(value)
    }
}

impl From<TypeName> for String {
    fn from(t: TypeName) -> Self {
        t.0
    }
}

/// A type known to a receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Canonical name
    pub name: TypeName,
    /// Shape non-null payloads of this type must have; `None` accepts any shape
    pub shape: Option<ValueKind>,
    /// Direct supertypes; empty means the type extends only `any`
    pub supertypes: Vec<TypeName>,
}

impl TypeDescriptor {
    /// Describe a type with the given shape and no explicit supertypes
    pub fn new(name: TypeName, shape: Option<ValueKind>) -> Self {
        TypeDescriptor {
            name,
            shape,
            supertypes: Vec::new(),
        }
    }

    /// Add a direct supertype
    pub fn extends(mut self, supertype: TypeName) -> Self {
        self.supertypes.push(supertype);
        self
    }
}

/// The receiving side's type universe.
///
/// Pre-populated with `any`, `null`, `bool`, `i64`, `f64`, `string`, `bytes`,
/// `list` and `map`. User types may only extend types that are already
/// registered, so the supertype graph is acyclic by construction.
pub struct TypeRegistry {
    types: RwLock<HashMap<TypeName, TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create a registry holding the built-in types
    pub fn new() -> Self {
        let builtins: [(&str, Option<ValueKind>); 9] = [
            (ANY, None),
            ("null", Some(ValueKind::Null)),
            ("bool", Some(ValueKind::Bool)),
            ("i64", Some(ValueKind::Int)),
            ("f64", Some(ValueKind::Float)),
            ("string", Some(ValueKind::String)),
            ("bytes", Some(ValueKind::Bytes)),
            ("list", Some(ValueKind::List)),
            ("map", Some(ValueKind::Map)),
        ];

        let mut types = HashMap::with_capacity(builtins.len());
        for (name, shape) in builtins {
            let name = TypeName(name.to_string());
            types.insert(name.clone(), TypeDescriptor::new(name, shape));
        }

        TypeRegistry {
            types: RwLock::new(types),
        }
    }

    /// Register a user type.
    ///
    /// # Errors
    ///
    /// - `DuplicateType` if the name is already registered
    /// - `UnknownType` if a supertype is not registered
    /// - `TypeMismatch` if the declared shape contradicts a supertype's shape
    pub fn register(&self, descriptor: TypeDescriptor) -> Result<()> {
        let mut types = self.types.write();
        if types.contains_key(&descriptor.name) {
            return Err(Error::DuplicateType(descriptor.name.to_string()));
        }
        for sup in &descriptor.supertypes {
            let sup_desc = types
                .get(sup)
                .ok_or_else(|| Error::UnknownType(sup.to_string()))?;
            if let (Some(own), Some(inherited)) =
                (descriptor.shape, Self::effective_shape(&types, sup_desc))
            {
                if own != inherited {
                    return Err(Error::type_mismatch(inherited.as_str(), own.as_str()));
                }
            }
        }
        types.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// True if the name is registered
    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.read().contains_key(name)
    }

    /// Look up a registered type
    pub fn get(&self, name: &TypeName) -> Option<TypeDescriptor> {
        self.types.read().get(name).cloned()
    }

    /// Whether a value declared as `from` may be used where `to` is expected.
    ///
    /// # Errors
    ///
    /// `UnknownType` if either name is not registered.
    pub fn is_assignable(&self, from: &TypeName, to: &TypeName) -> Result<bool> {
        let types = self.types.read();
        if !types.contains_key(from) {
            return Err(Error::UnknownType(from.to_string()));
        }
        if !types.contains_key(to) {
            return Err(Error::UnknownType(to.to_string()));
        }
        if from == to || to.as_str() == ANY {
            return Ok(true);
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == to {
                return Ok(true);
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(desc) = types.get(&current) {
                queue.extend(desc.supertypes.iter().cloned());
            }
        }
        Ok(false)
    }

    /// Shape required of non-null payloads declared as `name`, inherited from
    /// the nearest supertype that declares one.
    pub fn shape_of(&self, name: &TypeName) -> Result<Option<ValueKind>> {
        let types = self.types.read();
        let desc = types
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))?;
        Ok(Self::effective_shape(&types, desc))
    }

    /// Check a payload against its declared type's shape.
    ///
    /// `Null` conforms to every type.
    pub fn check_payload(&self, declared: &TypeName, payload: &Value) -> Result<()> {
        if payload.is_null() {
            return Ok(());
        }
        match self.shape_of(declared)? {
            Some(shape) if shape != payload.kind() => Err(Error::type_mismatch(
                format!("{} ({})", declared, shape),
                payload.kind().as_str(),
            )),
            _ => Ok(()),
        }
    }

    fn effective_shape(
        types: &HashMap<TypeName, TypeDescriptor>,
        desc: &TypeDescriptor,
    ) -> Option<ValueKind> {
        if desc.shape.is_some() {
            return desc.shape;
        }
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&TypeName> = desc.supertypes.iter().collect();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(sup) = types.get(name) {
                if sup.shape.is_some() {
                    return sup.shape;
                }
                queue.extend(sup.supertypes.iter());
            }
        }
        None
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
