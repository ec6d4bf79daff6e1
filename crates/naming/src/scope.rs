//! Naming scope: an explicit name -> binding table
//!
//! A [`NamingScope`] is passed by reference to whoever needs lookups; there
//! is no process-wide registry. Each binding is either an already resolved
//! target or a [`NamedReference`] that resolves on first access.
//!
//! Prefixes: a scope accepts a configured set of name prefixes (default
//! `java`). An accepted prefix is stripped before the binding table is
//! consulted, so `java:comp/env/x` and `comp/env/x` name the same binding.
//! Unknown prefixes fail with `InvalidName`.

use crate::name::LookupName;
use crate::reference::{AliasCycle, FailurePolicy, NamedReference, ResolutionStrategy, Target};
use parking_lot::RwLock;
use rivet_core::{Error, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Default accepted prefix
pub const DEFAULT_PREFIX: &str = "java";

/// What a name is bound to.
#[derive(Clone)]
pub enum Binding {
    /// An already resolved object
    Value(Target),
    /// A lazily resolved reference
    Reference(Arc<NamedReference>),
}

/// Names currently being resolved on this call path.
///
/// Threaded through alias resolution so a name that re-enters itself is
/// reported instead of recursing forever.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    path: Vec<String>,
}

impl ResolutionContext {
    /// Names on the current resolution path, outermost first
    pub fn path(&self) -> &[String] {
        &self.path
    }
}

/// A table of named bindings.
pub struct NamingScope {
    prefixes: Vec<String>,
    default_policy: FailurePolicy,
    bindings: RwLock<BTreeMap<String, Binding>>,
}

impl NamingScope {
    /// Create an empty scope accepting the `java` prefix
    pub fn new() -> Self {
        Self::with_prefixes([DEFAULT_PREFIX])
    }

    /// Create an empty scope accepting the given prefixes
    pub fn with_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NamingScope {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            default_policy: FailurePolicy::default(),
            bindings: RwLock::new(BTreeMap::new()),
        }
    }

    /// Set the failure policy used by [`bind`](Self::bind)
    pub fn with_default_policy(mut self, policy: FailurePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Failure policy used by [`bind`](Self::bind)
    pub fn default_policy(&self) -> FailurePolicy {
        self.default_policy
    }

    /// Normalize a name to its binding key.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the name does not parse or has an unknown prefix.
    pub fn normalize(&self, name: &str) -> Result<String> {
        let parsed = LookupName::parse(name)?;
        if let Some(prefix) = parsed.prefix() {
            if !self.prefixes.iter().any(|p| p == prefix) {
                return Err(Error::InvalidName {
                    name: name.to_string(),
                    reason: format!("unknown name prefix '{}:'", prefix),
                });
            }
        }
        Ok(parsed.path())
    }

    /// Bind a reference resolved by `strategy`, using the scope's default policy
    pub fn bind(&self, name: &str, strategy: ResolutionStrategy) -> Result<Arc<NamedReference>> {
        self.bind_with_policy(name, strategy, self.default_policy)
    }

    /// Bind a reference with an explicit failure policy.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if the name is taken, `InvalidName` if it is malformed.
    pub fn bind_with_policy(
        &self,
        name: &str,
        strategy: ResolutionStrategy,
        policy: FailurePolicy,
    ) -> Result<Arc<NamedReference>> {
        let key = self.normalize(name)?;
        let reference = Arc::new(NamedReference::new(key.clone(), strategy, policy));
        self.insert(key, Binding::Reference(Arc::clone(&reference)))?;
        Ok(reference)
    }

    /// Bind an already resolved object
    pub fn bind_value(&self, name: &str, target: Target) -> Result<()> {
        let key = self.normalize(name)?;
        self.insert(key, Binding::Value(target))
    }

    /// Bind or replace. Returns the previous binding, if any.
    pub fn rebind(&self, name: &str, binding: Binding) -> Result<Option<Binding>> {
        let key = self.normalize(name)?;
        debug!(name = %key, "rebinding");
        Ok(self.bindings.write().insert(key, binding))
    }

    /// Remove a binding.
    ///
    /// # Errors
    ///
    /// `NameNotFound` if nothing is bound under the name.
    pub fn unbind(&self, name: &str) -> Result<Binding> {
        let key = self.normalize(name)?;
        debug!(name = %key, "unbinding");
        self.bindings
            .write()
            .remove(&key)
            .ok_or(Error::NameNotFound(key))
    }

    /// The reference bound under `name`, if the binding is a reference
    pub fn reference(&self, name: &str) -> Result<Option<Arc<NamedReference>>> {
        let key = self.normalize(name)?;
        match self.bindings.read().get(&key) {
            Some(Binding::Reference(r)) => Ok(Some(Arc::clone(r))),
            Some(Binding::Value(_)) => Ok(None),
            None => Err(Error::NameNotFound(key)),
        }
    }

    /// Look up a name, resolving references on first access.
    ///
    /// # Errors
    ///
    /// - `NameNotFound` if nothing is bound under the name
    /// - `Resolution` if a reference fails to resolve (including alias cycles)
    /// - `InvalidName` if the name is malformed
    pub fn lookup(&self, name: &str) -> Result<Target> {
        self.lookup_in(name, &mut ResolutionContext::default())
    }

    /// Look up a name and downcast the target.
    ///
    /// # Errors
    ///
    /// As [`lookup`](Self::lookup), plus `TypeMismatch` if the target is not a `T`.
    pub fn lookup_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.lookup(name)?.downcast::<T>().map_err(|_| {
            Error::type_mismatch(std::any::type_name::<T>(), format!("object bound at {}", name))
        })
    }

    /// Names bound at or below `context`, sorted. An empty context lists everything.
    pub fn list(&self, context: &str) -> Result<Vec<String>> {
        let bindings = self.bindings.read();
        if context.trim().trim_matches('/').is_empty() {
            return Ok(bindings.keys().cloned().collect());
        }
        let key = self.normalize(context)?;
        let prefix = format!("{}/", key);
        Ok(bindings
            .keys()
            .filter(|k| **k == key || k.starts_with(&prefix))
            .cloned()
            .collect())
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// True if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    pub(crate) fn lookup_in(&self, name: &str, ctx: &mut ResolutionContext) -> Result<Target> {
        let key = self.normalize(name)?;

        if ctx.path.contains(&key) {
            let mut path = ctx.path.clone();
            path.push(key.clone());
            return Err(Error::resolution(key, AliasCycle { path }));
        }

        let binding = self
            .bindings
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NameNotFound(key.clone()))?;

        match binding {
            Binding::Value(target) => Ok(target),
            Binding::Reference(reference) => {
                ctx.path.push(key);
                let result = reference.resolve(self, ctx);
                ctx.path.pop();
                result
            }
        }
    }

    fn insert(&self, key: String, binding: Binding) -> Result<()> {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(&key) {
            return Err(Error::AlreadyBound(key));
        }
        debug!(name = %key, "binding");
        bindings.insert(key, binding);
        Ok(())
    }
}

impl Default for NamingScope {
    fn default() -> Self {
        Self::new()
    }
}
