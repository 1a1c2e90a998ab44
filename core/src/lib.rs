//! PolicyMachines - resilience policy runtime
//!
//! This crate executes caller-supplied operations under named resilience
//! policies, combining:
//! - Circuit breakers driven by sliding-window failure and slow-call rates
//! - Wall-clock time limiting with best-effort abandonment of stuck calls
//! - Caller-supplied fallbacks fed a typed failure cause
//! - A registry guaranteeing one shared failure history per policy name
//!
//! # Example
//!
//! ```rust
//! use policy_machines::{PolicyBuilder, PolicyRegistry};
//!
//! let registry = PolicyRegistry::new();
//! registry
//!     .register(
//!         PolicyBuilder::new("divide")
//!             .failure_rate_threshold(50.0)
//!             .minimum_calls(4)
//!             .call_timeout_secs(2.0)
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let value = registry
//!     .run("divide", || Ok::<_, String>(10 / 2), |_cause| Ok(0))
//!     .unwrap();
//! assert_eq!(value, 5);
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod engine;
pub mod errors;
pub mod limiter;
pub mod registry;
pub mod window;

pub use builder::PolicyBuilder;
pub use callbacks::Callbacks;
pub use circuit::{Breaker, Permission, PolicyConfig};
pub use engine::Engine;
pub use errors::{FailureCause, RegistryError, RunError};
pub use limiter::{LimitedCall, TimeLimiter};
pub use registry::{Policy, PolicyRegistry};
pub use window::{InMemoryWindow, NullWindow, WindowStore};

/// How one resolved call counts toward a breaker's sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Failure,
    Slow,
}

impl OutcomeKind {
    /// Classify a successful call by its duration
    ///
    /// Failed calls are never reclassified as slow; failure takes precedence.
    pub fn for_success(duration_secs: f64, slow_threshold_secs: f64) -> Self {
        if duration_secs >= slow_threshold_secs {
            OutcomeKind::Slow
        } else {
            OutcomeKind::Success
        }
    }
}

/// A single resolved call recorded by a breaker's window
#[derive(Debug, Clone)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub timestamp: f64,
    pub duration: f64,
}
