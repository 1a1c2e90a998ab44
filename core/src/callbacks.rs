//! Observer hooks for breaker transitions and call outcomes

use crate::OutcomeKind;
use std::sync::Arc;

/// Callbacks for breaker events
///
/// All hooks are optional; the runtime itself never depends on them. Wire
/// logging or metrics here instead of into the engine.
#[derive(Clone)]
pub struct Callbacks {
    pub on_open: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_close: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_half_open: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_rejected: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_outcome: Option<Arc<dyn Fn(&str, OutcomeKind, f64) + Send + Sync>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self {
            on_open: None,
            on_close: None,
            on_half_open: None,
            on_rejected: None,
            on_outcome: None,
        }
    }

    pub fn trigger_open(&self, circuit: &str) {
        if let Some(ref callback) = self.on_open {
            callback(circuit);
        }
    }

    pub fn trigger_close(&self, circuit: &str) {
        if let Some(ref callback) = self.on_close {
            callback(circuit);
        }
    }

    pub fn trigger_half_open(&self, circuit: &str) {
        if let Some(ref callback) = self.on_half_open {
            callback(circuit);
        }
    }

    pub fn trigger_rejected(&self, circuit: &str) {
        if let Some(ref callback) = self.on_rejected {
            callback(circuit);
        }
    }

    pub fn trigger_outcome(&self, circuit: &str, kind: OutcomeKind, duration: f64) {
        if let Some(ref callback) = self.on_outcome {
            callback(circuit, kind, duration);
        }
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .field("on_outcome", &self.on_outcome.is_some())
            .finish()
    }
}
