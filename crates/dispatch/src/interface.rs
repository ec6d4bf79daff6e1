//! Interface descriptors
//!
//! A proxy only accepts calls to methods declared on its interface. Each
//! method carries declared parameter and return types so remote handlers can
//! tag arguments and check replies.

use rivet_core::TypeName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared signature of one interface method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    name: String,
    parameter_types: Vec<TypeName>,
    return_type: TypeName,
}

impl MethodSignature {
    /// Create a signature
    pub fn new(
        name: impl Into<String>,
        parameter_types: Vec<TypeName>,
        return_type: TypeName,
    ) -> Self {
        MethodSignature {
            name: name.into(),
            parameter_types,
            return_type,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types, in order
    pub fn parameter_types(&self) -> &[TypeName] {
        &self.parameter_types
    }

    /// Declared return type
    pub fn return_type(&self) -> &TypeName {
        &self.return_type
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// A named set of methods. Method names are unique; there is no overloading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    name: String,
    methods: BTreeMap<String, MethodSignature>,
}

impl InterfaceDescriptor {
    /// Create an interface with no methods
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceDescriptor {
            name: name.into(),
            methods: BTreeMap::new(),
        }
    }

    /// Add a method, replacing any existing method of the same name
    pub fn with_method(mut self, method: MethodSignature) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }

    /// Interface name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name)
    }

    /// All methods, sorted by name
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.values()
    }
}
