//! Naming for rivet
//!
//! - `LookupName`: parsed `prefix:a/b/c` names
//! - `NamingScope`: explicit table of bindings passed to whoever needs lookups
//! - `NamedReference`: binding that resolves to its target on first access,
//!   either by aliasing another name or by calling a `ConnectionProvider`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod name;
pub mod reference;
pub mod scope;

pub use name::LookupName;
pub use reference::{
    AliasCycle, ConnectionProvider, FailurePolicy, NamedReference, ProviderError,
    ResolutionStrategy, Target,
};
pub use scope::{Binding, NamingScope, ResolutionContext, DEFAULT_PREFIX};
