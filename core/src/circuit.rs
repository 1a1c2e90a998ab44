//! Circuit breaker state machine
//!
//! One `Breaker` exists per named policy. All bookkeeping (permission
//! checks, half-open permits, outcome recording, transitions) happens behind
//! a single lock; the wrapped operation always executes outside of it.

use crate::{Outcome, OutcomeKind, callbacks::Callbacks, window::WindowStore};
use state_machines::state_machine;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Per-policy configuration, immutable once registered
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Unique policy name, also the circuit key in the window store
    pub name: String,

    /// Failure rate (percent, 0-100) at or above which the circuit opens
    pub failure_rate_threshold: f64,

    /// Slow-call rate (percent, 0-100) at or above which the circuit opens
    pub slow_call_rate_threshold: f64,

    /// Successful calls taking at least this many seconds count as slow
    pub slow_call_duration_secs: f64,

    /// Number of most recent call outcomes retained for rate evaluation
    pub sliding_window_size: usize,

    /// Outcomes required in the window before rates are evaluated
    pub minimum_calls: usize,

    /// Seconds the circuit stays open before a half-open probe is allowed
    pub open_wait_secs: f64,

    /// Trial calls admitted while half-open
    pub half_open_permits: usize,

    /// Seconds before an in-flight call resolves as a timeout
    pub call_timeout_secs: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_secs: 60.0,
            sliding_window_size: 100,
            minimum_calls: 10,
            open_wait_secs: 30.0,
            half_open_permits: 5,
            call_timeout_secs: 1.0,
        }
    }
}

/// Circuit breaker context - shared data across all states
#[derive(Clone)]
pub struct CircuitContext {
    pub config: PolicyConfig,
    pub store: Arc<dyn WindowStore>,
}

impl Default for CircuitContext {
    fn default() -> Self {
        Self {
            config: PolicyConfig::default(),
            store: Arc::new(crate::InMemoryWindow::new()),
        }
    }
}

impl std::fmt::Debug for CircuitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitContext")
            .field("config", &self.config)
            .field("store", &"<dyn WindowStore>")
            .finish()
    }
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    pub opened_at: f64,
}

/// Data specific to the HalfOpen state
#[derive(Debug, Clone, Default)]
pub struct HalfOpenData {
    pub permits_remaining: usize,
    pub successes: usize,
    pub failures: usize,
    pub slow: usize,
}

impl HalfOpenData {
    /// Trial calls whose outcome has been recorded
    fn resolved(&self) -> usize {
        self.successes + self.failures + self.slow
    }

    /// Failure or slow ratio among the trial calls crossed a threshold
    fn trips_threshold(&self, config: &PolicyConfig) -> bool {
        let total = self.resolved();
        if total == 0 {
            return false;
        }
        let failure_rate = self.failures as f64 / total as f64 * 100.0;
        let slow_rate = self.slow as f64 / total as f64 * 100.0;
        failure_rate >= config.failure_rate_threshold
            || slow_rate >= config.slow_call_rate_threshold
    }
}

// Define the circuit breaker state machine with dynamic mode
state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,  // Enable dynamic mode for runtime state transitions

    initial: Closed,
    states: [
        Closed,
        Open(OpenData),
        HalfOpen(HalfOpenData),
    ],
    events {
        trip {
            guards: [should_open],
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        attempt_reset {
            guards: [timeout_elapsed],
            transition: { from: Open, to: HalfOpen }
        }
        close {
            guards: [should_close],
            transition: { from: HalfOpen, to: Closed }
        }
    }
}

// Guards for dynamic mode - implemented on typestate machines
impl Circuit<Closed> {
    /// Check if either windowed rate has crossed its threshold
    fn should_open(&self, ctx: &CircuitContext) -> bool {
        let name = &ctx.config.name;

        if let Some(rate) = ctx.store.failure_rate(name, ctx.config.minimum_calls)
            && rate >= ctx.config.failure_rate_threshold
        {
            return true;
        }

        if let Some(rate) = ctx.store.slow_rate(name, ctx.config.minimum_calls)
            && rate >= ctx.config.slow_call_rate_threshold
        {
            return true;
        }

        false
    }
}

impl Circuit<HalfOpen> {
    /// Check if the trial batch resolved with too many failures or slow calls
    fn should_open(&self, ctx: &CircuitContext) -> bool {
        let data = self
            .state_data_half_open()
            .expect("HalfOpen state must have data");
        data.resolved() >= ctx.config.half_open_permits && data.trips_threshold(&ctx.config)
    }

    /// Check if the trial batch resolved within both thresholds
    fn should_close(&self, ctx: &CircuitContext) -> bool {
        let data = self
            .state_data_half_open()
            .expect("HalfOpen state must have data");
        data.resolved() >= ctx.config.half_open_permits && !data.trips_threshold(&ctx.config)
    }
}

impl Circuit<Open> {
    /// Check if the open cool-down has elapsed for Open -> HalfOpen
    fn timeout_elapsed(&self, ctx: &CircuitContext) -> bool {
        let data = self.state_data_open().expect("Open state must have data");
        let elapsed = ctx.store.monotonic_time() - data.opened_at;
        elapsed >= ctx.config.open_wait_secs
    }
}

/// Whether the breaker admits a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Admitted,
    Rejected { state: &'static str },
}

/// Circuit breaker bound to one named policy
///
/// Shared by every engine obtained for the policy's name; lives for the
/// process lifetime once created.
pub struct Breaker {
    context: CircuitContext,
    machine: Mutex<DynamicCircuit>,
    callbacks: Callbacks,
}

impl Breaker {
    pub fn new(config: PolicyConfig, store: Arc<dyn WindowStore>, callbacks: Callbacks) -> Self {
        info!(
            name = %config.name,
            failure_rate_threshold = config.failure_rate_threshold,
            sliding_window_size = config.sliding_window_size,
            open_wait_secs = config.open_wait_secs,
            "circuit breaker initialized"
        );

        let context = CircuitContext { config, store };
        let machine = Mutex::new(DynamicCircuit::new(context.clone()));

        Self {
            context,
            machine,
            callbacks,
        }
    }

    /// Policy name backing this breaker
    pub fn name(&self) -> &str {
        &self.context.config.name
    }

    /// Policy configuration backing this breaker
    pub fn config(&self) -> &PolicyConfig {
        &self.context.config
    }

    /// Decide whether a call may proceed under the current state
    ///
    /// While open this first attempts the open -> half-open transition, so a
    /// call arriving after the cool-down is evaluated under half-open rules
    /// in the same invocation. Half-open admission consumes a permit under
    /// the same lock as the check, bounding concurrent trial calls.
    pub fn acquire(&self) -> Permission {
        let mut machine = self.machine.lock().unwrap();

        if machine.current_state() == "Open" {
            let _ = machine.handle(CircuitEvent::AttemptReset);
            if machine.current_state() == "HalfOpen" {
                if let Some(data) = machine.half_open_data_mut() {
                    data.permits_remaining = self.context.config.half_open_permits;
                    data.successes = 0;
                    data.failures = 0;
                    data.slow = 0;
                }
                debug!(name = %self.name(), "circuit half-open, probing recovery");
                self.callbacks.trigger_half_open(self.name());
            }
        }

        match machine.current_state() {
            "Open" => self.reject("Open"),
            "HalfOpen" => {
                let admitted = machine
                    .half_open_data_mut()
                    .map(|data| {
                        if data.permits_remaining > 0 {
                            data.permits_remaining -= 1;
                            true
                        } else {
                            false
                        }
                    })
                    .unwrap_or(false);

                if admitted {
                    Permission::Admitted
                } else {
                    self.reject("HalfOpen")
                }
            }
            _ => Permission::Admitted,
        }
    }

    fn reject(&self, state: &'static str) -> Permission {
        debug!(name = %self.name(), state, "call rejected");
        self.callbacks.trigger_rejected(self.name());
        Permission::Rejected { state }
    }

    /// Record a resolved call and drive any resulting transition
    ///
    /// Rejected calls never reach this method, so the window only reflects
    /// the wrapped operation's own behavior. Outcomes arrive in completion
    /// order, which is the only order the rates care about.
    pub fn record(&self, kind: OutcomeKind, duration: f64) {
        let mut machine = self.machine.lock().unwrap();

        let timestamp = self.context.store.monotonic_time();
        self.context.store.record(
            self.name(),
            Outcome {
                kind,
                timestamp,
                duration,
            },
        );
        self.callbacks.trigger_outcome(self.name(), kind, duration);

        match machine.current_state() {
            "Closed" => {
                if machine.handle(CircuitEvent::Trip).is_ok() {
                    self.mark_open(&mut machine);
                }
            }
            "HalfOpen" => {
                if let Some(data) = machine.half_open_data_mut() {
                    match kind {
                        OutcomeKind::Success => data.successes += 1,
                        OutcomeKind::Failure => data.failures += 1,
                        OutcomeKind::Slow => data.slow += 1,
                    }
                }

                // Both guards require the full trial batch to be resolved
                if machine.handle(CircuitEvent::Trip).is_ok() {
                    self.context.store.clear(self.name());
                    self.mark_open(&mut machine);
                } else if machine.handle(CircuitEvent::Close).is_ok() {
                    self.context.store.clear(self.name());
                    info!(name = %self.name(), "circuit closed");
                    self.callbacks.trigger_close(self.name());
                }
            }
            _ => {
                // Completion of a call admitted before the circuit opened;
                // the window keeps it, the state does not change
            }
        }
    }

    /// Current state name: "Closed", "Open" or "HalfOpen"
    ///
    /// Reflects the last recorded transition; the open -> half-open probe
    /// only happens on `acquire`.
    pub fn state_name(&self) -> &'static str {
        self.machine.lock().unwrap().current_state()
    }

    /// Check if circuit is open
    pub fn is_open(&self) -> bool {
        self.state_name() == "Open"
    }

    /// Check if circuit is closed
    pub fn is_closed(&self) -> bool {
        self.state_name() == "Closed"
    }

    /// Most recent recorded outcomes, oldest first
    pub fn outcome_log(&self, limit: usize) -> Vec<Outcome> {
        self.context.store.outcome_log(self.name(), limit)
    }

    /// Clear all recorded outcomes and return to Closed
    pub fn reset(&self) {
        let mut machine = self.machine.lock().unwrap();
        self.context.store.clear(self.name());
        // Recreate machine in Closed state
        *machine = DynamicCircuit::new(self.context.clone());
    }

    /// Apply Open-state bookkeeping (timestamp + callback)
    fn mark_open(&self, machine: &mut DynamicCircuit) {
        if let Some(data) = machine.open_data_mut() {
            data.opened_at = self.context.store.monotonic_time();
        }
        warn!(name = %self.name(), "circuit opened");
        self.callbacks.trigger_open(self.name());
    }
}
