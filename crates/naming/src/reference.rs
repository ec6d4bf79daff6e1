//! Lazily resolved named references
//!
//! A [`NamedReference`] is bound under a name and turns into its target on
//! first access. The target is cached for the lifetime of the reference.
//!
//! ## Strategies
//!
//! - `Link`: re-enter the owning scope under another name (aliasing)
//! - `Provider`: call a [`ConnectionProvider`]; its error is translated into
//!   `Error::Resolution` with the provider error kept as the cause
//!
//! ## Resolution state machine
//!
//! ```text
//! Unresolved --first access--> Resolving --ok--> Resolved (terminal)
//!                                  |
//!                                  +--err, Retry--------> Unresolved
//!                                  +--err, CacheFailure--> Failed (terminal)
//! ```
//!
//! Provider resolution is single-flight: while one caller runs the provider,
//! every other caller waits and receives that attempt's outcome. Aliases are
//! followed without holding the slot, so two aliases resolving through each
//! other on different threads cannot deadlock; cycles are caught by the
//! per-lookup resolution path instead.

use crate::scope::{NamingScope, ResolutionContext};
use parking_lot::{Condvar, Mutex};
use rivet_core::{Cause, Error, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A resolved object as seen by naming clients.
pub type Target = Arc<dyn Any + Send + Sync>;

/// Error type connection providers may return.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Callback that produces the target of a reference.
///
/// Called at most once per successful resolution; may block on I/O.
pub trait ConnectionProvider: Send + Sync {
    /// Produce the target for the reference bound under `name`
    fn connect(&self, name: &str) -> std::result::Result<Target, ProviderError>;
}

impl<F> ConnectionProvider for F
where
    F: Fn(&str) -> std::result::Result<Target, ProviderError> + Send + Sync,
{
    fn connect(&self, name: &str) -> std::result::Result<Target, ProviderError> {
        self(name)
    }
}

/// How a reference finds its target.
#[derive(Clone)]
pub enum ResolutionStrategy {
    /// Look up another name in the same scope
    Link(String),
    /// Ask a provider
    Provider(Arc<dyn ConnectionProvider>),
}

impl ResolutionStrategy {
    /// Alias to another name
    pub fn link(target: impl Into<String>) -> Self {
        ResolutionStrategy::Link(target.into())
    }

    /// Resolve through a provider
    pub fn provider(provider: impl ConnectionProvider + 'static) -> Self {
        ResolutionStrategy::Provider(Arc::new(provider))
    }
}

impl fmt::Debug for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Link(target) => f.debug_tuple("Link").field(target).finish(),
            ResolutionStrategy::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// What happens after a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Forget the failure; the next access tries again
    #[default]
    Retry,
    /// Remember the failure; every later access fails fast with it
    CacheFailure,
}

/// Alias chain that leads back to one of its own names.
#[derive(Debug, Clone, thiserror::Error)]
#[error("alias cycle: {}", .path.join(" -> "))]
pub struct AliasCycle {
    /// Names visited, ending with the repeated one
    pub path: Vec<String>,
}

enum Slot {
    Unresolved,
    Resolving,
    Resolved(Target),
    Failed(Error),
}

struct SlotState {
    slot: Slot,
    attempt: u64,
    last_failure: Option<(u64, Error)>,
}

/// A name bound to a lazily resolved target.
pub struct NamedReference {
    name: String,
    strategy: ResolutionStrategy,
    policy: FailurePolicy,
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl NamedReference {
    /// Create an unresolved reference
    pub fn new(name: impl Into<String>, strategy: ResolutionStrategy, policy: FailurePolicy) -> Self {
        NamedReference {
            name: name.into(),
            strategy,
            policy,
            state: Mutex::new(SlotState {
                slot: Slot::Unresolved,
                attempt: 0,
                last_failure: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Name the reference is bound under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolution strategy
    pub fn strategy(&self) -> &ResolutionStrategy {
        &self.strategy
    }

    /// Failure policy
    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// True once a target has been cached
    pub fn is_resolved(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Resolved(_))
    }

    /// Number of resolution attempts started so far
    pub fn attempts(&self) -> u64 {
        self.state.lock().attempt
    }

    pub(crate) fn resolve(&self, scope: &NamingScope, ctx: &mut ResolutionContext) -> Result<Target> {
        match &self.strategy {
            ResolutionStrategy::Link(target) => self.resolve_link(target, scope, ctx),
            ResolutionStrategy::Provider(provider) => self.resolve_provider(provider.as_ref()),
        }
    }

    fn resolve_link(
        &self,
        target: &str,
        scope: &NamingScope,
        ctx: &mut ResolutionContext,
    ) -> Result<Target> {
        {
            let mut state = self.state.lock();
            match &state.slot {
                Slot::Resolved(t) => return Ok(t.clone()),
                Slot::Failed(e) => return Err(e.clone()),
                _ => {}
            }
            state.attempt += 1;
        }

        debug!(name = %self.name, alias = target, "following alias");
        match scope.lookup_in(target, ctx) {
            Ok(resolved) => {
                let mut state = self.state.lock();
                if let Slot::Resolved(existing) = &state.slot {
                    return Ok(existing.clone());
                }
                state.slot = Slot::Resolved(resolved.clone());
                Ok(resolved)
            }
            Err(e) => {
                let err = match e {
                    Error::Resolution { .. } => e,
                    other => Error::resolution(self.name.clone(), other),
                };
                let mut state = self.state.lock();
                // A concurrent lookup may have resolved the alias meanwhile
                if let Slot::Resolved(existing) = &state.slot {
                    return Ok(existing.clone());
                }
                warn!(name = %self.name, alias = target, error = %err, "alias resolution failed");
                if self.policy == FailurePolicy::CacheFailure
                    && matches!(state.slot, Slot::Unresolved)
                {
                    state.slot = Slot::Failed(err.clone());
                }
                Err(err)
            }
        }
    }

    fn resolve_provider(&self, provider: &dyn ConnectionProvider) -> Result<Target> {
        let attempt = {
            let mut state = self.state.lock();
            loop {
                let waiting_on = match &state.slot {
                    Slot::Resolved(t) => return Ok(t.clone()),
                    Slot::Failed(e) => return Err(e.clone()),
                    Slot::Resolving => state.attempt,
                    Slot::Unresolved => break,
                };

                while matches!(state.slot, Slot::Resolving) && state.attempt == waiting_on {
                    self.ready.wait(&mut state);
                }
                if let Some((failed, err)) = &state.last_failure {
                    if *failed == waiting_on {
                        return Err(err.clone());
                    }
                }
            }
            state.attempt += 1;
            state.slot = Slot::Resolving;
            state.attempt
        };

        // Resets the slot if the provider panics so waiters are not stranded
        let guard = ResolvingGuard {
            reference: self,
            finished: false,
        };

        debug!(name = %self.name, attempt, "resolving through provider");
        let outcome = provider.connect(&self.name).map_err(|e| Error::Resolution {
            name: self.name.clone(),
            cause: Cause::new(e),
        });
        guard.finish(attempt, outcome)
    }
}

impl fmt::Debug for NamedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedReference")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("policy", &self.policy)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

struct ResolvingGuard<'a> {
    reference: &'a NamedReference,
    finished: bool,
}

impl<'a> ResolvingGuard<'a> {
    fn finish(mut self, attempt: u64, outcome: Result<Target>) -> Result<Target> {
        let reference = self.reference;
        {
            let mut state = reference.state.lock();
            match &outcome {
                Ok(target) => {
                    info!(name = %reference.name, attempt, "reference resolved");
                    state.slot = Slot::Resolved(target.clone());
                }
                Err(err) => {
                    warn!(name = %reference.name, attempt, error = %err, "reference resolution failed");
                    state.slot = match reference.policy {
                        FailurePolicy::Retry => Slot::Unresolved,
                        FailurePolicy::CacheFailure => Slot::Failed(err.clone()),
                    };
                    state.last_failure = Some((attempt, err.clone()));
                }
            }
            self.finished = true;
        }
        reference.ready.notify_all();
        outcome
    }
}

impl<'a> Drop for ResolvingGuard<'a> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        {
            let mut state = self.reference.state.lock();
            state.slot = Slot::Unresolved;
        }
        warn!(name = %self.reference.name, "provider panicked; reference reset to unresolved");
        self.reference.ready.notify_all();
    }
}
