//! Named-policy registry
//!
//! The registry maps policy names to their configuration and lazily creates
//! exactly one breaker per name, so every caller of a policy contributes to
//! a single shared failure history. It is an explicit object: hand it (or an
//! `Arc` of it) to whoever needs policy execution; there is no ambient
//! global state.

use crate::{
    builder::PolicyBuilder,
    callbacks::Callbacks,
    circuit::{Breaker, PolicyConfig},
    engine::Engine,
    errors::{FailureCause, RegistryError, RunError},
    window::{InMemoryWindow, WindowStore},
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A registered policy: configuration plus observer hooks and window backend
pub struct Policy {
    pub(crate) config: PolicyConfig,
    pub(crate) callbacks: Callbacks,
    pub(crate) store: Option<Arc<dyn WindowStore>>,
}

impl Policy {
    /// Start building a policy with the given name
    pub fn builder(name: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub(crate) fn create_breaker(&self) -> Arc<Breaker> {
        let store = self.store.clone().unwrap_or_else(|| {
            Arc::new(InMemoryWindow::with_capacity(self.config.sliding_window_size))
        });
        Arc::new(Breaker::new(
            self.config.clone(),
            store,
            self.callbacks.clone(),
        ))
    }
}

struct Registered {
    policy: Policy,
    breaker: Option<Arc<Breaker>>,
}

/// Maps policy names to configuration and one shared breaker each
pub struct PolicyRegistry {
    policies: RwLock<HashMap<String, Registered>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// Register a policy; names are unique and registration is not idempotent
    pub fn register(&self, policy: Policy) -> Result<(), RegistryError> {
        let mut policies = self.policies.write().unwrap();
        if policies.contains_key(policy.name()) {
            return Err(RegistryError::DuplicatePolicy {
                name: policy.name().to_string(),
            });
        }
        policies.insert(
            policy.name().to_string(),
            Registered {
                policy,
                breaker: None,
            },
        );
        Ok(())
    }

    /// Engine bound to the named policy, creating its breaker on first use
    ///
    /// Every engine returned for one name shares the same breaker.
    pub fn engine(&self, name: &str) -> Result<Engine, RegistryError> {
        let mut policies = self.policies.write().unwrap();
        let entry = policies
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownPolicy {
                name: name.to_string(),
            })?;
        let breaker = entry
            .breaker
            .get_or_insert_with(|| entry.policy.create_breaker())
            .clone();
        Ok(Engine::with_breaker(breaker))
    }

    /// Execute `operation` under the named policy
    ///
    /// The sole execution entry point: resolves the policy's engine and
    /// delegates to it, so the operation either returns its own value, the
    /// fallback's value, or (fatally) the fallback's error.
    pub fn run<T, E, F, FB>(&self, name: &str, operation: F, fallback: FB) -> Result<T, RunError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        FB: FnOnce(FailureCause<E>) -> Result<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let engine = self.engine(name).map_err(|_| RunError::UnknownPolicy {
            name: name.to_string(),
        })?;
        engine.run(operation, fallback)
    }

    /// Registered policy names, unordered
    pub fn names(&self) -> Vec<String> {
        self.policies.read().unwrap().keys().cloned().collect()
    }

    /// Reset the named policy's breaker, if it has been used yet
    pub fn reset(&self, name: &str) -> Result<(), RegistryError> {
        let policies = self.policies.read().unwrap();
        let entry = policies.get(name).ok_or_else(|| RegistryError::UnknownPolicy {
            name: name.to_string(),
        })?;
        if let Some(breaker) = &entry.breaker {
            breaker.reset();
        }
        Ok(())
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
