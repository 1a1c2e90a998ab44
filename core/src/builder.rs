//! Builder API for ergonomic policy configuration

use crate::{
    OutcomeKind, callbacks::Callbacks, circuit::PolicyConfig, registry::Policy,
    window::WindowStore,
};
use std::sync::Arc;

/// Fluent builder for policies
///
/// Starts from `PolicyConfig::default()`; every setter overrides one field.
/// Rates are clamped to 0-100 and counts that must be positive are floored
/// at 1.
pub struct PolicyBuilder {
    config: PolicyConfig,
    store: Option<Arc<dyn WindowStore>>,
    callbacks: Callbacks,
}

impl PolicyBuilder {
    /// Create a new builder for a policy with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: PolicyConfig {
                name: name.into(),
                ..PolicyConfig::default()
            },
            store: None,
            callbacks: Callbacks::new(),
        }
    }

    /// Failure rate (percent) at or above which the circuit opens
    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.config.failure_rate_threshold = percent.clamp(0.0, 100.0);
        self
    }

    /// Slow-call rate (percent) at or above which the circuit opens
    pub fn slow_call_rate_threshold(mut self, percent: f64) -> Self {
        self.config.slow_call_rate_threshold = percent.clamp(0.0, 100.0);
        self
    }

    /// Successful calls at least this long count as slow
    pub fn slow_call_duration_secs(mut self, seconds: f64) -> Self {
        self.config.slow_call_duration_secs = seconds.max(0.0);
        self
    }

    /// Number of most recent call outcomes retained for rate evaluation
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.config.sliding_window_size = size.max(1);
        self
    }

    /// Outcomes required in the window before rates are evaluated
    pub fn minimum_calls(mut self, calls: usize) -> Self {
        self.config.minimum_calls = calls;
        self
    }

    /// Seconds the circuit stays open before a half-open probe is allowed
    pub fn open_wait_secs(mut self, seconds: f64) -> Self {
        self.config.open_wait_secs = seconds.max(0.0);
        self
    }

    /// Trial calls admitted while half-open
    pub fn half_open_permits(mut self, permits: usize) -> Self {
        self.config.half_open_permits = permits.max(1);
        self
    }

    /// Seconds before an in-flight call resolves as a timeout
    pub fn call_timeout_secs(mut self, seconds: f64) -> Self {
        self.config.call_timeout_secs = seconds.max(0.0);
        self
    }

    /// Custom window backend (shared or pre-seeded stores)
    pub fn window_store(mut self, store: Arc<dyn WindowStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set callback for when the circuit opens
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when the circuit closes
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when the circuit enters half-open
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Set callback for every rejected call
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_rejected = Some(Arc::new(f));
        self
    }

    /// Set callback observing every recorded outcome
    pub fn on_outcome<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, OutcomeKind, f64) + Send + Sync + 'static,
    {
        self.callbacks.on_outcome = Some(Arc::new(f));
        self
    }

    /// Build the policy
    pub fn build(self) -> Policy {
        Policy {
            config: self.config,
            callbacks: self.callbacks,
            store: self.store,
        }
    }
}
